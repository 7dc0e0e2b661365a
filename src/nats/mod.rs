//! Streaming speech recognition over NATS
//!
//! Frames go out on `audio.frame.<session_id>`; the STT service answers on
//! `stt.text.partial` / `stt.text.final` with the session id in the payload.

pub mod client;
pub mod messages;

pub use client::{frame_message, frame_subject, NatsRecognizer, TranscriptFeed, TRANSCRIPT_SUBJECT};
pub use messages::{AudioFrameMessage, TranscriptMessage};
