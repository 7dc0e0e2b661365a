pub mod audio;
pub mod config;
pub mod error;
pub mod http;
pub mod nats;
pub mod services;
pub mod session;
pub mod transcript;

pub use audio::{AudioFrameBuffer, Frame, FrameStream};
pub use config::Config;
pub use error::{PipelineError, PipelineResult};
pub use http::{create_router, AppState};
pub use nats::{AudioFrameMessage, NatsRecognizer, TranscriptMessage};
pub use services::{
    CompletionService, RecognitionParams, Services, SpeechRecognizer, SpeechSynthesizer,
};
pub use session::{
    ControlSignal, Emission, Reply, ResponsePipeline, Session, SessionConfig, SessionEvent,
    SessionStats, TurnState,
};
pub use transcript::{classify, Classification, TranscriptEvent};
