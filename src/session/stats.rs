use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Counters for one connection, reported when it goes away
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    pub session_id: String,

    /// When the client connected
    pub connected_at: DateTime<Utc>,

    /// Connection lifetime in seconds
    pub duration_secs: f64,

    /// Number of `Idle -> Listening` transitions
    pub turns_started: usize,

    /// Audio responses delivered to the client
    pub responses_delivered: usize,

    /// Frames handed to the recognizer
    pub frames_forwarded: usize,

    /// Inbound audio chunks dropped because the session was not listening
    pub chunks_dropped: usize,

    /// `error` emissions sent to the client
    pub errors_reported: usize,
}

impl SessionStats {
    pub fn new(session_id: String) -> Self {
        Self {
            session_id,
            connected_at: Utc::now(),
            duration_secs: 0.0,
            turns_started: 0,
            responses_delivered: 0,
            frames_forwarded: 0,
            chunks_dropped: 0,
            errors_reported: 0,
        }
    }
}
