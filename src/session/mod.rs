//! Conversation session management
//!
//! One `Session` per client connection. It owns:
//! - the turn state (`Idle -> Listening -> Responding -> Idle`)
//! - re-framing of inbound audio for the recognizer
//! - at most one live recognition stream
//! - deduplication of final transcripts across turns
//! - dispatch of the completion + synthesis pipeline

mod config;
mod pipeline;
mod session;
mod state;
mod stats;

pub use config::SessionConfig;
pub use pipeline::{Reply, ResponsePipeline};
pub use session::{ControlSignal, Emission, Session, SessionEvent};
pub use state::TurnState;
pub use stats::SessionStats;
