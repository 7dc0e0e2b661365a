use crate::session::{ControlSignal, Emission};
use axum::extract::ws::Message;
use serde::{Deserialize, Serialize};

/// Control messages sent by the client as JSON text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    StartTranscription,
    StopTranscription,
    PlaybackFinished,
}

impl From<ClientMessage> for ControlSignal {
    fn from(msg: ClientMessage) -> Self {
        match msg {
            ClientMessage::StartTranscription => ControlSignal::StartListening,
            ClientMessage::StopTranscription => ControlSignal::StopListening,
            ClientMessage::PlaybackFinished => ControlSignal::PlaybackFinished,
        }
    }
}

/// Text messages sent to the client. Audio responses go out as binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    Transcription {
        text: String,
        #[serde(rename = "isFinal")]
        is_final: bool,
    },
    Error {
        message: String,
    },
}

/// Encode a session emission as a WebSocket message
pub fn to_ws_message(emission: Emission) -> Result<Message, serde_json::Error> {
    let text = match emission {
        Emission::AudioResponse(audio) => return Ok(Message::Binary(audio)),
        Emission::Transcription { text, is_final } => {
            serde_json::to_string(&ServerMessage::Transcription { text, is_final })?
        }
        Emission::Error { message } => serde_json::to_string(&ServerMessage::Error { message })?,
    };
    Ok(Message::Text(text))
}
