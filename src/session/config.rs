use crate::audio::DEFAULT_FRAME_SIZE;
use crate::config::AudioConfig;
use crate::services::RecognitionParams;
use serde::{Deserialize, Serialize};

/// Per-connection settings, derived once from the process configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Bytes per frame handed to the recognizer
    pub frame_size: usize,

    /// Capacity of the session's event queue and of each frame queue
    pub queue_capacity: usize,

    /// Encoding parameters sent with every recognition stream
    pub recognition: RecognitionParams,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            frame_size: DEFAULT_FRAME_SIZE,
            queue_capacity: 256,
            recognition: RecognitionParams::default(),
        }
    }
}

impl From<&AudioConfig> for SessionConfig {
    fn from(audio: &AudioConfig) -> Self {
        Self {
            frame_size: audio.frame_size,
            queue_capacity: audio.queue_capacity,
            recognition: RecognitionParams {
                sample_rate: audio.sample_rate,
                encoding: audio.encoding.clone(),
                language: audio.language.clone(),
            },
        }
    }
}
