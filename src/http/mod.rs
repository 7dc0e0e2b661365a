//! HTTP / WebSocket transport
//!
//! - GET /health - Health check
//! - GET /ws - Voice session (JSON control messages, binary audio both ways)
//! - everything else - static browser client, when configured

pub mod messages;
mod routes;
mod state;
mod ws;

pub use messages::{to_ws_message, ClientMessage, ServerMessage};
pub use routes::create_router;
pub use state::AppState;
