// Shared mocks for session and pipeline tests
//
// Each mock implements one service trait in-process and records how it was
// called, so tests can assert on call counts and arguments.

#![allow(dead_code)]

use futures::channel::mpsc as stream_channel;
use futures::stream::{self, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use voice_loop::services::{AudioStream, TranscriptStream};
use voice_loop::{
    CompletionService, Emission, Frame, FrameStream, PipelineError, PipelineResult,
    RecognitionParams, Services, Session, SessionConfig, SessionEvent, SpeechRecognizer,
    SpeechSynthesizer, TranscriptEvent,
};

const WAIT: Duration = Duration::from_secs(5);

/// One recognition stream opened on the scripted recognizer
pub struct RecognitionFeed {
    pub session_id: String,
    pub params: RecognitionParams,
    /// Push transcript events (or failures) into the stream
    pub events: stream_channel::UnboundedSender<PipelineResult<TranscriptEvent>>,
    /// Frames the recognizer pulled so far
    pub frames: Arc<Mutex<Vec<Frame>>>,
    /// Set once the frame stream ended
    pub frames_done: Arc<AtomicBool>,
}

impl RecognitionFeed {
    pub fn say(&self, event: TranscriptEvent) {
        self.events.unbounded_send(Ok(event)).expect("recognition stream dropped");
    }

    /// True once the session dropped the transcript stream
    pub fn stream_released(&self) -> bool {
        self.events.is_closed()
    }

    pub fn frame_count(&self) -> usize {
        self.frames.lock().unwrap().len()
    }

    pub fn received_bytes(&self) -> Vec<u8> {
        self.frames
            .lock()
            .unwrap()
            .iter()
            .flat_map(|f| f.as_bytes().to_vec())
            .collect()
    }
}

/// Recognizer whose transcript stream is driven by the test
pub struct ScriptedRecognizer {
    opened: mpsc::UnboundedSender<RecognitionFeed>,
    fail_with: Option<PipelineError>,
}

impl ScriptedRecognizer {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<RecognitionFeed>) {
        let (opened, feeds) = mpsc::unbounded_channel();
        (
            Arc::new(Self {
                opened,
                fail_with: None,
            }),
            feeds,
        )
    }

    pub fn failing(error: PipelineError) -> (Arc<Self>, mpsc::UnboundedReceiver<RecognitionFeed>) {
        let (opened, feeds) = mpsc::unbounded_channel();
        (
            Arc::new(Self {
                opened,
                fail_with: Some(error),
            }),
            feeds,
        )
    }
}

#[async_trait::async_trait]
impl SpeechRecognizer for ScriptedRecognizer {
    async fn stream(
        &self,
        session_id: &str,
        params: &RecognitionParams,
        mut frames: FrameStream,
    ) -> PipelineResult<TranscriptStream> {
        if let Some(error) = &self.fail_with {
            return Err(error.clone());
        }

        let (events, transcripts) = stream_channel::unbounded();
        let collected = Arc::new(Mutex::new(Vec::new()));
        let frames_done = Arc::new(AtomicBool::new(false));

        let sink = Arc::clone(&collected);
        let done = Arc::clone(&frames_done);
        tokio::spawn(async move {
            while let Some(frame) = frames.next().await {
                sink.lock().unwrap().push(frame);
            }
            done.store(true, Ordering::SeqCst);
        });

        let _ = self.opened.send(RecognitionFeed {
            session_id: session_id.to_string(),
            params: params.clone(),
            events,
            frames: collected,
            frames_done,
        });

        Ok(transcripts.boxed())
    }
}

/// Completion service returning a fixed reply, optionally held until released
pub struct MockCompletion {
    reply: PipelineResult<String>,
    gate: Option<Arc<Notify>>,
    pub prompts: Mutex<Vec<String>>,
}

impl MockCompletion {
    pub fn replying(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(reply.to_string()),
            gate: None,
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(PipelineError::Completion(message.to_string())),
            gate: None,
            prompts: Mutex::new(Vec::new()),
        })
    }

    /// Replies only after `gate.notify_one()`
    pub fn gated(reply: &str, gate: Arc<Notify>) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(reply.to_string()),
            gate: Some(gate),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl CompletionService for MockCompletion {
    async fn complete(&self, prompt: &str) -> PipelineResult<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.reply.clone()
    }
}

/// Synthesizer streaming fixed chunks
pub struct MockSynthesizer {
    chunks: Vec<PipelineResult<Vec<u8>>>,
    fail_with: Option<PipelineError>,
    pub texts: Mutex<Vec<String>>,
}

impl MockSynthesizer {
    pub fn streaming(chunks: &[&[u8]]) -> Arc<Self> {
        Arc::new(Self {
            chunks: chunks.iter().map(|c| Ok(c.to_vec())).collect(),
            fail_with: None,
            texts: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            chunks: Vec::new(),
            fail_with: Some(PipelineError::Synthesis(message.to_string())),
            texts: Mutex::new(Vec::new()),
        })
    }

    /// Stream whose second chunk fails
    pub fn breaking_mid_stream(message: &str) -> Arc<Self> {
        Arc::new(Self {
            chunks: vec![
                Ok(b"first".to_vec()),
                Err(PipelineError::Synthesis(message.to_string())),
                Ok(b"never".to_vec()),
            ],
            fail_with: None,
            texts: Mutex::new(Vec::new()),
        })
    }

    pub fn texts(&self) -> Vec<String> {
        self.texts.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl SpeechSynthesizer for MockSynthesizer {
    async fn synthesize(&self, text: &str) -> PipelineResult<AudioStream> {
        self.texts.lock().unwrap().push(text.to_string());
        if let Some(error) = &self.fail_with {
            return Err(error.clone());
        }
        Ok(stream::iter(self.chunks.clone()).boxed())
    }
}

pub fn services(
    recognizer: Arc<ScriptedRecognizer>,
    completion: Arc<MockCompletion>,
    synthesizer: Arc<MockSynthesizer>,
) -> Services {
    Services {
        recognizer,
        completion,
        synthesizer,
    }
}

/// Drives a `Session` by hand, one event at a time
pub struct Harness {
    pub session: Session,
    pub loopback: mpsc::Receiver<SessionEvent>,
    pub emissions: mpsc::Receiver<Emission>,
    pub feeds: mpsc::UnboundedReceiver<RecognitionFeed>,
}

impl Harness {
    pub fn new(services: Services, feeds: mpsc::UnboundedReceiver<RecognitionFeed>) -> Self {
        let config = SessionConfig::default();
        let (loopback_tx, loopback) = mpsc::channel(config.queue_capacity);
        let (emit_tx, emissions) = mpsc::channel(config.queue_capacity);
        let session = Session::new(
            "test-session".to_string(),
            config,
            services,
            loopback_tx,
            emit_tx,
        );

        Self {
            session,
            loopback,
            emissions,
            feeds,
        }
    }

    pub async fn send(&mut self, event: SessionEvent) {
        self.session.handle(event).await;
    }

    /// Handle the next event produced by work the session spawned
    pub async fn pump(&mut self) {
        let event = tokio::time::timeout(WAIT, self.loopback.recv())
            .await
            .expect("timed out waiting for a session event")
            .expect("loopback queue closed");
        self.session.handle(event).await;
    }

    pub async fn next_feed(&mut self) -> RecognitionFeed {
        tokio::time::timeout(WAIT, self.feeds.recv())
            .await
            .expect("timed out waiting for a recognition stream")
            .expect("recognizer dropped")
    }

    pub fn drain_emissions(&mut self) -> Vec<Emission> {
        let mut out = Vec::new();
        while let Ok(emission) = self.emissions.try_recv() {
            out.push(emission);
        }
        out
    }
}

/// Poll `condition` until it holds or the test deadline passes
pub async fn wait_for(mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + WAIT;
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not met in time"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// `len` bytes of a repeating 0..=250 pattern, offset by `start`
pub fn pcm(len: usize, start: usize) -> Vec<u8> {
    (0..len).map(|i| ((start + i) % 251) as u8).collect()
}
