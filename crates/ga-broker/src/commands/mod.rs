//! Application command dispatch.
//!
//! A [`CommandTable`] maps command names to [`CommandHandler`]s and wraps
//! every invocation in its [`Middleware`] chain. Handlers are synchronous
//! and may run on the blocking pool; they talk back to clients only through
//! the [`Responder`] they are given.

pub mod middleware;
pub mod responder;
pub mod table;

pub use middleware::{Invocation, Middleware, Next, TraceCommands};
pub use responder::Responder;
pub use table::CommandTable;

use ga_core::CommandError;
use serde_json::Value;

/// A registered application command.
///
/// `payload` is the whole inbound envelope, `command` key included. The
/// handler may reply, broadcast, both or neither. It should validate before
/// mutating `state`: the broker does not roll back a handler that fails
/// halfway.
pub trait CommandHandler<S>: Send + Sync + 'static {
    /// Run the command against `state`.
    fn handle(&self, state: &S, payload: &Value, out: &Responder) -> Result<(), CommandError>;
}

impl<S, F> CommandHandler<S> for F
where
    F: Fn(&S, &Value, &Responder) -> Result<(), CommandError> + Send + Sync + 'static,
{
    fn handle(&self, state: &S, payload: &Value, out: &Responder) -> Result<(), CommandError> {
        self(state, payload, out)
    }
}
