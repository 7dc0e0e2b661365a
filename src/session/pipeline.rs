use crate::error::PipelineResult;
use crate::services::{CompletionService, Services, SpeechSynthesizer};
use futures::stream::StreamExt;
use std::sync::Arc;
use tracing::{debug, info};

/// Outcome of a successful `respond` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Reply text and its synthesized audio, as one contiguous payload
    Spoken { text: String, audio: Vec<u8> },
    /// Blank transcript; no service was called
    Skipped,
}

/// Runs completion then synthesis for one final transcript
///
/// The three steps are strictly sequential since each needs the previous
/// output. Synthesized chunks are collected into a single buffer so the
/// client receives one payload per turn.
#[derive(Clone)]
pub struct ResponsePipeline {
    completion: Arc<dyn CompletionService>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
}

impl ResponsePipeline {
    pub fn new(
        completion: Arc<dyn CompletionService>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
    ) -> Self {
        Self {
            completion,
            synthesizer,
        }
    }

    pub fn from_services(services: &Services) -> Self {
        Self::new(
            Arc::clone(&services.completion),
            Arc::clone(&services.synthesizer),
        )
    }

    pub async fn respond(&self, transcript: &str) -> PipelineResult<Reply> {
        if transcript.trim().is_empty() {
            debug!("Skipping response for blank transcript");
            return Ok(Reply::Skipped);
        }

        let text = self.completion.complete(transcript).await?;
        info!("Completion response: {}", text);

        let mut stream = self.synthesizer.synthesize(&text).await?;

        let mut audio = Vec::new();
        let mut chunks = 0usize;
        while let Some(chunk) = stream.next().await {
            audio.extend_from_slice(&chunk?);
            chunks += 1;
        }

        debug!("Synthesized {} bytes in {} chunks", audio.len(), chunks);

        Ok(Reply::Spoken { text, audio })
    }
}
