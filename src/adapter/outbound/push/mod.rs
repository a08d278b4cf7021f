//! WebSocket push feed adapter.

pub mod message;
pub mod stream;

pub use stream::WebSocketPushStream;
