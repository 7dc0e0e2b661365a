use super::{AudioStream, SpeechSynthesizer};
use crate::config::SynthesisConfig;
use crate::error::{PipelineError, PipelineResult};
use futures::stream::StreamExt;
use tracing::debug;

/// OpenAI-compatible `/audio/speech` client
#[derive(Debug, Clone)]
pub struct SpeechClient {
    config: SynthesisConfig,
    client: reqwest::Client,
}

impl SpeechClient {
    pub fn new(config: SynthesisConfig) -> PipelineResult<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| PipelineError::Synthesis(e.to_string()))?;

        Ok(Self { config, client })
    }

    fn endpoint(&self) -> String {
        format!("{}/audio/speech", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait::async_trait]
impl SpeechSynthesizer for SpeechClient {
    async fn synthesize(&self, text: &str) -> PipelineResult<AudioStream> {
        let body = serde_json::json!({
            "model": self.config.model,
            "input": text,
            "voice": self.config.voice,
            "response_format": self.config.format,
            "sample_rate": self.config.sample_rate,
        });

        debug!(
            "Requesting synthesis ({} chars, voice={}) from {}",
            text.chars().count(),
            self.config.voice,
            self.endpoint()
        );

        let res = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| PipelineError::Synthesis(e.to_string()))?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(PipelineError::Synthesis(format!(
                "TTS API error {}: {}",
                status, body
            )));
        }

        let audio = res.bytes_stream().map(|chunk| {
            chunk
                .map(|bytes| bytes.to_vec())
                .map_err(|e| PipelineError::Synthesis(e.to_string()))
        });

        Ok(audio.boxed())
    }
}
