use super::config::SessionConfig;
use super::pipeline::{Reply, ResponsePipeline};
use super::state::TurnState;
use super::stats::SessionStats;
use crate::audio::{frame_stream, AudioFrameBuffer, Frame};
use crate::error::{PipelineError, PipelineResult};
use crate::services::Services;
use crate::transcript::{classify, Classification, TranscriptEvent};
use chrono::Utc;
use futures::stream::StreamExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Session-control signals sent by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSignal {
    StartListening,
    StopListening,
    /// The client finished playing the last response
    PlaybackFinished,
}

/// Everything a session reacts to, processed one at a time in arrival order
#[derive(Debug)]
pub enum SessionEvent {
    Control(ControlSignal),
    Audio(Vec<u8>),

    // Results of work the session spawned, tagged with the turn that started it
    Transcript {
        turn: u64,
        event: TranscriptEvent,
    },
    RecognitionFailed {
        turn: u64,
        error: PipelineError,
    },
    RecognitionEnded {
        turn: u64,
    },
    ResponseFinished {
        turn: u64,
        outcome: PipelineResult<Reply>,
    },

    Disconnect,
}

/// What a session sends back to the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Emission {
    Transcription { text: String, is_final: bool },
    AudioResponse(Vec<u8>),
    Error { message: String },
}

/// The live recognition stream of the current turn
struct RecognitionHandle {
    turn: u64,
    frames: mpsc::Sender<Frame>,
    cancelled: Arc<AtomicBool>,
    /// Wakes the transcript consumer so it drops the stream right away
    stop: oneshot::Sender<()>,
}

impl RecognitionHandle {
    /// Stop the frame producer and release the transcript stream.
    ///
    /// A recognizer call still setting up the stream is left to finish; its
    /// stream is dropped as soon as it is handed back.
    fn cancel(self) {
        self.cancelled.store(true, Ordering::SeqCst);
        drop(self.frames);
        let _ = self.stop.send(());
    }
}

/// Per-connection turn controller
///
/// Owns all mutable state of one client connection. Exactly one task drives
/// it (see [`Session::run`]), so transitions never interleave and the
/// single-recognition-stream rule is upheld by the state guard alone.
pub struct Session {
    id: String,
    config: SessionConfig,
    services: Services,
    pipeline: ResponsePipeline,

    state: TurnState,
    frames: AudioFrameBuffer,
    /// Last final transcript dispatched for a response
    last_final: String,
    recognition: Option<RecognitionHandle>,
    /// Incremented on every `Idle -> Listening` transition
    turn: u64,

    /// Sender side of this session's own event queue, for spawned work
    loopback: mpsc::Sender<SessionEvent>,
    outbound: mpsc::Sender<Emission>,

    stats: SessionStats,
}

impl Session {
    /// Create a session. `loopback` must feed the queue later passed to
    /// [`Session::run`] (or drained by the caller into [`Session::handle`]).
    pub fn new(
        id: String,
        config: SessionConfig,
        services: Services,
        loopback: mpsc::Sender<SessionEvent>,
        outbound: mpsc::Sender<Emission>,
    ) -> Self {
        info!("Creating session: {}", id);

        Self {
            frames: AudioFrameBuffer::new(config.frame_size),
            pipeline: ResponsePipeline::from_services(&services),
            stats: SessionStats::new(id.clone()),
            id,
            config,
            services,
            state: TurnState::Idle,
            last_final: String::new(),
            recognition: None,
            turn: 0,
            loopback,
            outbound,
        }
    }

    /// Create a session and drive it on its own task.
    ///
    /// Returns the sender for transport events and the task handle, which
    /// resolves to the session's stats after a `Disconnect`.
    pub fn spawn(
        id: String,
        config: SessionConfig,
        services: Services,
        outbound: mpsc::Sender<Emission>,
    ) -> (mpsc::Sender<SessionEvent>, JoinHandle<SessionStats>) {
        let (events_tx, events_rx) = mpsc::channel(config.queue_capacity);
        let session = Session::new(id, config, services, events_tx.clone(), outbound);
        let task = tokio::spawn(session.run(events_rx));
        (events_tx, task)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    pub fn turn(&self) -> u64 {
        self.turn
    }

    pub fn last_final(&self) -> &str {
        &self.last_final
    }

    /// Audio buffered towards the next frame
    pub fn pending_audio(&self) -> &[u8] {
        self.frames.pending()
    }

    pub fn has_active_recognition(&self) -> bool {
        self.recognition.is_some()
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Process events until `Disconnect`, then tear the session down
    pub async fn run(mut self, mut events: mpsc::Receiver<SessionEvent>) -> SessionStats {
        info!("Session {} started", self.id);

        while let Some(event) = events.recv().await {
            if let SessionEvent::Disconnect = event {
                break;
            }
            self.handle(event).await;
        }

        self.disconnect()
    }

    /// Apply a single event
    pub async fn handle(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Control(signal) => match signal {
                ControlSignal::StartListening | ControlSignal::PlaybackFinished => {
                    self.start_listening(signal)
                }
                ControlSignal::StopListening => self.stop_listening(),
            },
            SessionEvent::Audio(chunk) => self.on_audio(chunk).await,
            SessionEvent::Transcript { turn, event } => self.on_transcript(turn, event).await,
            SessionEvent::RecognitionFailed { turn, error } => {
                self.on_recognition_failed(turn, error).await
            }
            SessionEvent::RecognitionEnded { turn } => self.on_recognition_ended(turn),
            SessionEvent::ResponseFinished { turn, outcome } => {
                self.on_response_finished(turn, outcome).await
            }
            SessionEvent::Disconnect => {
                self.teardown_recognition();
                self.transition(TurnState::Idle);
            }
        }
    }

    /// Tear down and report. Consumes the session.
    pub fn disconnect(mut self) -> SessionStats {
        self.teardown_recognition();

        let duration = Utc::now().signed_duration_since(self.stats.connected_at);
        self.stats.duration_secs = duration.num_milliseconds() as f64 / 1000.0;

        info!(
            "Session {} disconnected after {:.1}s ({} turns, {} responses)",
            self.id,
            self.stats.duration_secs,
            self.stats.turns_started,
            self.stats.responses_delivered
        );

        self.stats
    }

    fn start_listening(&mut self, signal: ControlSignal) {
        match self.state {
            TurnState::Listening => {
                debug!("Session {} already listening, {:?} ignored", self.id, signal);
            }
            TurnState::Responding => {
                debug!("Session {} is responding, {:?} ignored", self.id, signal);
            }
            TurnState::Idle => {
                self.turn += 1;
                self.stats.turns_started += 1;
                self.frames.reset();

                info!(
                    "Starting transcription for session {} (turn {}, {:?})",
                    self.id, self.turn, signal
                );

                self.begin_recognition();
                self.transition(TurnState::Listening);
            }
        }
    }

    fn stop_listening(&mut self) {
        if self.state == TurnState::Idle {
            debug!("Session {} is idle, stop ignored", self.id);
            return;
        }

        info!("Stopping transcription for session {}", self.id);
        self.teardown_recognition();
        self.transition(TurnState::Idle);
    }

    async fn on_audio(&mut self, chunk: Vec<u8>) {
        if !self.state.accepts_audio() {
            self.stats.chunks_dropped += 1;
            return;
        }

        let frames = self.frames.ingest(&chunk);

        let Some(handle) = self.recognition.as_ref() else {
            return;
        };

        for frame in frames {
            if handle.frames.send(frame).await.is_err() {
                warn!("Recognizer for session {} stopped taking frames", self.id);
                break;
            }
            self.stats.frames_forwarded += 1;
        }
    }

    async fn on_transcript(&mut self, turn: u64, event: TranscriptEvent) {
        if self.state != TurnState::Listening || turn != self.turn {
            debug!(
                "Discarding transcript from turn {} (session {} is {} on turn {})",
                turn, self.id, self.state, self.turn
            );
            return;
        }

        match classify(&event, &self.last_final) {
            Classification::Qualified(text) => {
                info!("Final transcription: {}", text);

                // Synchronous with the transition so a second final cannot sneak in
                self.teardown_recognition();
                self.transition(TurnState::Responding);

                self.emit(Emission::Transcription {
                    text: text.clone(),
                    is_final: true,
                })
                .await;

                self.last_final = text.clone();
                self.dispatch_response(text);
            }
            Classification::PartialUpdate(fragment) => {
                self.emit(Emission::Transcription {
                    text: fragment,
                    is_final: false,
                })
                .await;
            }
            Classification::Ignored => {
                debug!("Ignoring transcript event: {:?}", event);
            }
        }
    }

    async fn on_recognition_failed(&mut self, turn: u64, error: PipelineError) {
        if self.state != TurnState::Listening || turn != self.turn {
            debug!("Discarding recognition failure from turn {}: {}", turn, error);
            return;
        }

        error!("Transcription error in session {}: {}", self.id, error);
        self.teardown_recognition();
        self.transition(TurnState::Idle);
        self.emit(Emission::Error {
            message: error.to_string(),
        })
        .await;
    }

    fn on_recognition_ended(&mut self, turn: u64) {
        if self.state != TurnState::Listening || turn != self.turn {
            return;
        }

        info!("Recognition stream for session {} ended", self.id);
        self.teardown_recognition();
        self.transition(TurnState::Idle);
    }

    async fn on_response_finished(&mut self, turn: u64, outcome: PipelineResult<Reply>) {
        if self.state != TurnState::Responding || turn != self.turn {
            debug!(
                "Discarding response from turn {} (session {} is {} on turn {})",
                turn, self.id, self.state, self.turn
            );
            return;
        }

        match outcome {
            Ok(Reply::Spoken { audio, .. }) => {
                let len = audio.len();
                self.emit(Emission::AudioResponse(audio)).await;
                self.stats.responses_delivered += 1;
                info!("Sent audio response to session {} ({} bytes)", self.id, len);
            }
            Ok(Reply::Skipped) => {}
            Err(e) => {
                error!("Error in processing or synthesis: {}", e);
                self.emit(Emission::Error {
                    message: e.to_string(),
                })
                .await;
            }
        }

        self.transition(TurnState::Idle);
    }

    fn begin_recognition(&mut self) {
        let (frames_tx, frames_rx) = mpsc::channel(self.config.queue_capacity);
        let cancelled = Arc::new(AtomicBool::new(false));
        let frames = frame_stream(frames_rx, Arc::clone(&cancelled));

        let turn = self.turn;
        let recognizer = Arc::clone(&self.services.recognizer);
        let loopback = self.loopback.clone();
        let session_id = self.id.clone();
        let params = self.config.recognition.clone();
        let flag = Arc::clone(&cancelled);
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

        tokio::spawn(async move {
            let mut transcripts = match recognizer.stream(&session_id, &params, frames).await {
                Ok(stream) => stream,
                Err(error) => {
                    let _ = loopback
                        .send(SessionEvent::RecognitionFailed { turn, error })
                        .await;
                    return;
                }
            };

            loop {
                let item = tokio::select! {
                    biased;
                    _ = &mut stop_rx => break,
                    item = transcripts.next() => item,
                };

                let Some(item) = item else {
                    if !flag.load(Ordering::SeqCst) {
                        let _ = loopback.send(SessionEvent::RecognitionEnded { turn }).await;
                    }
                    break;
                };

                if flag.load(Ordering::SeqCst) {
                    break;
                }

                let event = match item {
                    Ok(event) => SessionEvent::Transcript { turn, event },
                    Err(error) => {
                        let _ = loopback
                            .send(SessionEvent::RecognitionFailed { turn, error })
                            .await;
                        break;
                    }
                };

                if loopback.send(event).await.is_err() {
                    break;
                }
            }

            drop(transcripts);
            debug!("Recognition task for session {} turn {} finished", session_id, turn);
        });

        self.recognition = Some(RecognitionHandle {
            turn,
            frames: frames_tx,
            cancelled,
            stop: stop_tx,
        });
    }

    fn teardown_recognition(&mut self) {
        if let Some(handle) = self.recognition.take() {
            debug!("Tearing down recognition for session {} turn {}", self.id, handle.turn);
            handle.cancel();
        }
    }

    fn dispatch_response(&self, transcript: String) {
        let pipeline = self.pipeline.clone();
        let loopback = self.loopback.clone();
        let turn = self.turn;

        tokio::spawn(async move {
            let outcome = pipeline.respond(&transcript).await;
            let _ = loopback
                .send(SessionEvent::ResponseFinished { turn, outcome })
                .await;
        });
    }

    fn transition(&mut self, next: TurnState) {
        if self.state != next {
            debug!("Session {}: {} -> {}", self.id, self.state, next);
            self.state = next;
        }
    }

    async fn emit(&mut self, emission: Emission) {
        if let Emission::Error { .. } = emission {
            self.stats.errors_reported += 1;
        }
        if self.outbound.send(emission).await.is_err() {
            debug!("Client for session {} is gone, emission dropped", self.id);
        }
    }
}
