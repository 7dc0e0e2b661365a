use anyhow::{bail, Result};
use serde::Deserialize;

/// Prefix for environment overrides, e.g. `VOICE_LOOP__COMPLETION__API_KEY`
pub const ENV_PREFIX: &str = "VOICE_LOOP";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub audio: AudioConfig,
    pub recognition: RecognitionConfig,
    pub completion: CompletionConfig,
    pub synthesis: SynthesisConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
    /// Directory with the browser client, served at `/` when set
    pub static_dir: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "voice-loop".to_string(),
            http: HttpConfig::default(),
            static_dir: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Bytes per frame handed to the recognizer
    pub frame_size: usize,
    pub sample_rate: u32,
    pub encoding: String,
    pub language: String,
    /// Capacity of the per-session event and frame queues
    pub queue_capacity: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            frame_size: 1024,
            sample_rate: 44100,
            encoding: "pcm".to_string(),
            language: "en-US".to_string(),
            queue_capacity: 256,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RecognitionConfig {
    pub nats_url: String,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            nats_url: "nats://localhost:4222".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub system_prompt: String,
    pub max_reply_chars: usize,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.groq.com/openai/v1".to_string(),
            api_key: String::new(),
            model: "llama-3.3-70b-versatile".to_string(),
            system_prompt:
                "You are a helpful assistant. Keep responses clear and concise under 2800 characters"
                    .to_string(),
            max_reply_chars: 2800,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub voice: String,
    /// Output container, e.g. "mp3"
    pub format: String,
    pub sample_rate: u32,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            model: "tts-1".to_string(),
            voice: "alloy".to_string(),
            format: "mp3".to_string(),
            sample_rate: 16000,
        }
    }
}

impl Config {
    /// Load configuration from `path` (extension optional, file optional)
    /// layered under `VOICE_LOOP__*` environment variables.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;

        let mut cfg: Config = settings.try_deserialize()?;

        // Well-known provider variables fill keys left empty
        if cfg.completion.api_key.is_empty() {
            if let Ok(key) = std::env::var("GROQ_API_KEY") {
                cfg.completion.api_key = key;
            }
        }
        if cfg.synthesis.api_key.is_empty() {
            if let Ok(key) = std::env::var("OPENAI_API_KEY") {
                cfg.synthesis.api_key = key;
            }
        }

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.audio.frame_size == 0 {
            bail!("audio.frame_size must be greater than zero");
        }
        if self.audio.queue_capacity == 0 {
            bail!("audio.queue_capacity must be greater than zero");
        }
        if self.completion.max_reply_chars == 0 {
            bail!("completion.max_reply_chars must be greater than zero");
        }
        Ok(())
    }
}
