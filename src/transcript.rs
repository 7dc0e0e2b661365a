//! Transcript classification
//!
//! Recognizers stream two kinds of results: growing partials for the
//! utterance in progress, and finals once an utterance is complete. Finals
//! may be re-emitted near stream boundaries, so they are checked against the
//! last one the session dispatched.

use serde::{Deserialize, Serialize};

/// A single recognition result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEvent {
    pub text: String,
    pub is_final: bool,
}

impl TranscriptEvent {
    pub fn partial(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: false,
        }
    }

    pub fn final_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: true,
        }
    }
}

/// What the session should do with a recognition result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// A new, non-empty final utterance: start a response
    Qualified(String),
    /// Trailing word of a partial, for live feedback only
    PartialUpdate(String),
    Ignored,
}

/// Classify `event` given the last final the session dispatched.
pub fn classify(event: &TranscriptEvent, last_final: &str) -> Classification {
    if event.is_final {
        if event.text == last_final || event.text.trim().is_empty() {
            return Classification::Ignored;
        }
        return Classification::Qualified(event.text.clone());
    }

    // Only the fragment after the last space is forwarded. Partials are
    // advisory, so this cheap delta is good enough.
    let fragment = match event.text.rfind(' ') {
        Some(idx) => &event.text[idx + 1..],
        None => event.text.as_str(),
    };

    if fragment.trim().is_empty() {
        Classification::Ignored
    } else {
        Classification::PartialUpdate(fragment.to_string())
    }
}
