use super::CompletionService;
use crate::config::CompletionConfig;
use crate::error::{PipelineError, PipelineResult};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// OpenAI-compatible chat completions client (Groq, OpenAI, OpenRouter, ...)
#[derive(Debug, Clone)]
pub struct ChatCompletionClient {
    config: CompletionConfig,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

impl ChatCompletionClient {
    pub fn new(config: CompletionConfig) -> PipelineResult<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| PipelineError::Completion(e.to_string()))?;

        Ok(Self { config, client })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait::async_trait]
impl CompletionService for ChatCompletionClient {
    async fn complete(&self, prompt: &str) -> PipelineResult<String> {
        let body = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &self.config.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
        };

        debug!("Requesting completion from {}", self.endpoint());

        let res = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| PipelineError::Completion(e.to_string()))?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(PipelineError::Completion(format!(
                "completion API error {}: {}",
                status, body
            )));
        }

        let parsed: ChatResponse = res
            .json()
            .await
            .map_err(|e| PipelineError::Completion(e.to_string()))?;

        let reply = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| PipelineError::Completion("completion returned no choices".to_string()))?;

        let reply = truncate_chars(reply, self.config.max_reply_chars);
        info!("Completion reply: {} chars", reply.chars().count());

        Ok(reply)
    }
}

/// Cut `text` down to at most `max_chars` characters
pub fn truncate_chars(mut text: String, max_chars: usize) -> String {
    if let Some((idx, _)) = text.char_indices().nth(max_chars) {
        text.truncate(idx);
    }
    text
}
