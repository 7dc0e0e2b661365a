//! External service seams
//!
//! The session only talks to speech recognition, text completion and speech
//! synthesis through these traits. Production clients:
//! - `NatsRecognizer` (crate::nats): streaming STT bridged over NATS
//! - `ChatCompletionClient`: OpenAI-compatible chat completions (Groq by default)
//! - `SpeechClient`: OpenAI-compatible `/audio/speech`

mod completion;
mod synthesis;

pub use completion::{truncate_chars, ChatCompletionClient};
pub use synthesis::SpeechClient;

use crate::audio::FrameStream;
use crate::config::Config;
use crate::error::PipelineResult;
use crate::nats::NatsRecognizer;
use crate::transcript::TranscriptEvent;
use anyhow::{Context, Result};
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Lazy sequence of recognition results
pub type TranscriptStream = BoxStream<'static, PipelineResult<TranscriptEvent>>;

/// Lazy sequence of synthesized audio chunks
pub type AudioStream = BoxStream<'static, PipelineResult<Vec<u8>>>;

/// Fixed encoding parameters sent along with the audio frames
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecognitionParams {
    pub sample_rate: u32,
    pub encoding: String,
    pub language: String,
}

impl Default for RecognitionParams {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            encoding: "pcm".to_string(),
            language: "en-US".to_string(),
        }
    }
}

/// Streaming speech recognition
#[async_trait::async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Start a recognition stream for `session_id`.
    ///
    /// The recognizer pulls `frames` at its own pace. The returned stream
    /// yields results until the frames run out or the service fails.
    async fn stream(
        &self,
        session_id: &str,
        params: &RecognitionParams,
        frames: FrameStream,
    ) -> PipelineResult<TranscriptStream>;
}

/// Text completion
#[async_trait::async_trait]
pub trait CompletionService: Send + Sync {
    /// Produce a concise reply to `prompt`
    async fn complete(&self, prompt: &str) -> PipelineResult<String>;
}

/// Speech synthesis
#[async_trait::async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text`, returning the audio as a byte stream
    async fn synthesize(&self, text: &str) -> PipelineResult<AudioStream>;
}

/// The three collaborators a session needs, shared by every connection
#[derive(Clone)]
pub struct Services {
    pub recognizer: Arc<dyn SpeechRecognizer>,
    pub completion: Arc<dyn CompletionService>,
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
}

impl Services {
    /// Build the production clients from configuration
    pub async fn connect(config: &Config) -> Result<Self> {
        let recognizer = NatsRecognizer::connect(&config.recognition.nats_url)
            .await
            .context("Failed to set up speech recognition")?;
        let completion = ChatCompletionClient::new(config.completion.clone())
            .context("Failed to set up completion client")?;
        let synthesizer = SpeechClient::new(config.synthesis.clone())
            .context("Failed to set up synthesis client")?;

        Ok(Self {
            recognizer: Arc::new(recognizer),
            completion: Arc::new(completion),
            synthesizer: Arc::new(synthesizer),
        })
    }
}
