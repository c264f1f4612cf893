//! WebSocket transport: one task pair per accepted socket.

pub mod session;

pub use session::{SessionOptions, run_ws_session};
