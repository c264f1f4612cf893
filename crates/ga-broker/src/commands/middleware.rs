//! Interceptors wrapped around every command invocation.
//!
//! Middleware runs in registration order: the first one layered is the
//! outermost. Each decides whether to call [`Next::run`], and may act before
//! and after it.

use std::sync::Arc;
use std::time::{Duration, Instant};

use ga_core::CommandError;
use metrics::histogram;
use serde_json::Value;
use tracing::{debug, warn};

use super::{CommandHandler, Responder};
use crate::metrics::COMMAND_DURATION_SECONDS;

/// Everything a middleware can see about one invocation.
pub struct Invocation<'a, S> {
    /// Command name.
    pub command: &'a str,
    /// Session state the handler will receive.
    pub state: &'a S,
    /// Whole inbound envelope.
    pub payload: &'a Value,
    /// Reply and broadcast capabilities.
    pub out: &'a Responder,
}

/// The rest of the chain.
pub struct Next<'a, S> {
    rest: &'a [Arc<dyn Middleware<S>>],
    handler: &'a dyn CommandHandler<S>,
}

impl<'a, S: 'static> Next<'a, S> {
    pub(crate) fn new(rest: &'a [Arc<dyn Middleware<S>>], handler: &'a dyn CommandHandler<S>) -> Self {
        Self { rest, handler }
    }

    /// Run the remaining middleware and then the handler.
    pub fn run(self, cx: &Invocation<'_, S>) -> Result<(), CommandError> {
        match self.rest.split_first() {
            Some((first, rest)) => first.call(cx, Next::new(rest, self.handler)),
            None => self.handler.handle(cx.state, cx.payload, cx.out),
        }
    }
}

/// A command interceptor.
pub trait Middleware<S>: Send + Sync + 'static {
    /// Handle `cx`, usually by calling `next.run(cx)` somewhere inside.
    fn call(&self, cx: &Invocation<'_, S>, next: Next<'_, S>) -> Result<(), CommandError>;
}

/// Logs each command and records its duration.
#[derive(Clone, Copy, Debug)]
pub struct TraceCommands {
    slow_after: Duration,
}

impl TraceCommands {
    /// Warn about commands running longer than `slow_after`.
    pub fn new(slow_after: Duration) -> Self {
        Self { slow_after }
    }
}

impl Default for TraceCommands {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

impl<S: 'static> Middleware<S> for TraceCommands {
    fn call(&self, cx: &Invocation<'_, S>, next: Next<'_, S>) -> Result<(), CommandError> {
        debug!(command = cx.command, session = cx.out.session(), conn_id = %cx.out.origin(), "command start");
        let start = Instant::now();
        let result = next.run(cx);
        let elapsed = start.elapsed();

        histogram!(COMMAND_DURATION_SECONDS, "command" => cx.command.to_owned())
            .record(elapsed.as_secs_f64());
        if elapsed >= self.slow_after {
            warn!(command = cx.command, duration_secs = elapsed.as_secs_f64(), "slow command");
        }
        debug!(command = cx.command, ok = result.is_ok(), "command done");
        result
    }
}
