//! Error types for the voice loop

use thiserror::Error;

/// Result type alias for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Failures of the external services a session talks to.
///
/// None of these are fatal to the connection: each is reported to the client
/// once and the session goes back to idle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// Recognition stream setup or mid-stream failure
    #[error("Transcription error: {0}")]
    Recognition(String),

    /// Completion call failure
    #[error("Processing error: {0}")]
    Completion(String),

    /// Synthesis call or stream drain failure
    #[error("Synthesis error: {0}")]
    Synthesis(String),
}
