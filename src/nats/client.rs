use super::messages::{AudioFrameMessage, TranscriptMessage};
use crate::audio::FrameStream;
use crate::error::{PipelineError, PipelineResult};
use crate::services::{RecognitionParams, SpeechRecognizer, TranscriptStream};
use crate::transcript::TranscriptEvent;
use anyhow::{Context, Result};
use async_nats::Client;
use base64::Engine;
use futures::stream::{self, Stream, StreamExt};
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

/// Subject the STT service publishes partial and final transcripts on
pub const TRANSCRIPT_SUBJECT: &str = "stt.text.>";

/// Subject audio frames for `session_id` are published on
pub fn frame_subject(session_id: &str) -> String {
    format!("audio.frame.{}", session_id)
}

/// Build the wire message for one frame (or the empty final marker)
pub fn frame_message(
    session_id: &str,
    params: &RecognitionParams,
    sequence: u32,
    pcm_bytes: &[u8],
    is_final: bool,
) -> AudioFrameMessage {
    AudioFrameMessage {
        session_id: session_id.to_string(),
        sequence,
        pcm: base64::engine::general_purpose::STANDARD.encode(pcm_bytes),
        sample_rate: params.sample_rate,
        channels: 1,
        encoding: params.encoding.clone(),
        language: params.language.clone(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        final_frame: is_final,
    }
}

/// Speech recognizer backed by an STT service listening on NATS
#[derive(Clone)]
pub struct NatsRecognizer {
    client: Client,
}

impl NatsRecognizer {
    /// Connect to NATS server
    pub async fn connect(url: &str) -> Result<Self> {
        info!("Connecting to NATS at {}", url);

        let client = async_nats::connect(url)
            .await
            .context("Failed to connect to NATS")?;

        info!("Connected to NATS successfully");

        Ok(Self { client })
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl SpeechRecognizer for NatsRecognizer {
    async fn stream(
        &self,
        session_id: &str,
        params: &RecognitionParams,
        frames: FrameStream,
    ) -> PipelineResult<TranscriptStream> {
        // Subscribe before the first frame goes out so no result is missed
        let subscriber = self
            .client
            .subscribe(TRANSCRIPT_SUBJECT)
            .await
            .map_err(|e| {
                PipelineError::Recognition(format!("Failed to subscribe to transcripts: {}", e))
            })?;

        info!(
            "Recognition stream opened for session {} ({} Hz, {}, {})",
            session_id, params.sample_rate, params.encoding, params.language
        );

        let (done_tx, done_rx) = oneshot::channel();
        let client = self.client.clone();
        let publisher_session = session_id.to_string();
        let publisher_params = params.clone();

        tokio::spawn(async move {
            let outcome = publish_frames(client, &publisher_session, &publisher_params, frames).await;
            if let Err(e) = &outcome {
                error!("Frame publisher for session {} failed: {}", publisher_session, e);
            }
            let _ = done_tx.send(outcome);
        });

        let payloads = subscriber.map(|msg| msg.payload);
        let transcripts = TranscriptFeed::new(payloads, session_id, done_rx).into_stream();

        Ok(transcripts.boxed())
    }
}

/// Drain `frames` onto the session's frame subject, then send the final marker.
/// Returns the number of frames published.
async fn publish_frames(
    client: Client,
    session_id: &str,
    params: &RecognitionParams,
    mut frames: FrameStream,
) -> PipelineResult<u32> {
    let subject = frame_subject(session_id);
    let mut sequence: u32 = 0;

    while let Some(frame) = frames.next().await {
        let message = frame_message(session_id, params, sequence, frame.as_bytes(), false);
        publish(&client, &subject, &message).await?;
        sequence += 1;
    }

    let marker = frame_message(session_id, params, sequence, &[], true);
    publish(&client, &subject, &marker).await?;

    client
        .flush()
        .await
        .map_err(|e| PipelineError::Recognition(format!("Failed to flush audio frames: {}", e)))?;

    Ok(sequence)
}

async fn publish(client: &Client, subject: &str, message: &AudioFrameMessage) -> PipelineResult<()> {
    let payload =
        serde_json::to_vec(message).map_err(|e| PipelineError::Recognition(e.to_string()))?;

    client
        .publish(subject.to_string(), payload.into())
        .await
        .map_err(|e| PipelineError::Recognition(format!("Failed to publish audio frame: {}", e)))
}

enum Step<P> {
    Payload(Option<P>),
    Publisher(Result<PipelineResult<u32>, oneshot::error::RecvError>),
}

/// Transcript side of one recognition stream
///
/// Reads raw `stt.text.*` payloads, keeps those for `session_id` and turns
/// them into transcript events. The stream ends when the payloads run out,
/// when the publisher reports a failure (yielded once), or on the first
/// final after the publisher sent the final marker.
pub struct TranscriptFeed<S> {
    payloads: S,
    session_id: String,
    publisher: Option<oneshot::Receiver<PipelineResult<u32>>>,
    /// Set once the final marker went out; the next final ends the stream
    frames_closed: bool,
    finished: bool,
}

impl<S> TranscriptFeed<S>
where
    S: Stream + Unpin + Send + 'static,
    S::Item: AsRef<[u8]> + Send,
{
    /// `publisher` resolves with the frame publisher's outcome
    pub fn new(
        payloads: S,
        session_id: &str,
        publisher: oneshot::Receiver<PipelineResult<u32>>,
    ) -> Self {
        Self {
            payloads,
            session_id: session_id.to_string(),
            publisher: Some(publisher),
            frames_closed: false,
            finished: false,
        }
    }

    pub fn into_stream(self) -> TranscriptStream {
        stream::unfold(self, |mut feed| async move {
            let item = feed.next_event().await?;
            Some((item, feed))
        })
        .boxed()
    }

    pub async fn next_event(&mut self) -> Option<PipelineResult<TranscriptEvent>> {
        if self.finished {
            return None;
        }

        loop {
            let step = match self.publisher.as_mut() {
                Some(done) => tokio::select! {
                    payload = self.payloads.next() => Step::Payload(payload),
                    outcome = done => Step::Publisher(outcome),
                },
                None => Step::Payload(self.payloads.next().await),
            };

            match step {
                Step::Publisher(outcome) => {
                    self.publisher = None;
                    match outcome {
                        Ok(Ok(published)) => {
                            debug!(
                                "Published {} frames for session {}",
                                published, self.session_id
                            );
                            self.frames_closed = true;
                        }
                        Ok(Err(e)) => {
                            self.finished = true;
                            return Some(Err(e));
                        }
                        Err(_) => {
                            self.frames_closed = true;
                        }
                    }
                }
                Step::Payload(None) => {
                    info!("Transcript subscription closed for session {}", self.session_id);
                    self.finished = true;
                    return None;
                }
                Step::Payload(Some(payload)) => {
                    let transcript =
                        match serde_json::from_slice::<TranscriptMessage>(payload.as_ref()) {
                            Ok(transcript) => transcript,
                            Err(e) => {
                                warn!("Failed to parse transcript message: {}", e);
                                continue;
                            }
                        };

                    // Filter by session_id
                    if transcript.session_id != self.session_id {
                        continue;
                    }

                    let event = TranscriptEvent {
                        text: transcript.text,
                        is_final: !transcript.partial,
                    };

                    if event.is_final && self.frames_closed {
                        self.finished = true;
                    }

                    return Some(Ok(event));
                }
            }
        }
    }
}
