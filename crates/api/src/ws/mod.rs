//! WebSocket push of controller state.
//!
//! Each connection receives the current [`GenerationStatus`] on connect,
//! every later status change, and every lifecycle event from the bus.
//!
//! [`GenerationStatus`]: studio_pipeline::GenerationStatus

mod handler;
pub mod message;

pub use handler::ws_handler;
pub use message::WsMessage;
