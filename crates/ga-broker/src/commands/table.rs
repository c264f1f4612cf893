//! Command name → handler table.

use std::collections::HashMap;
use std::sync::Arc;

use ga_core::RouteError;
use metrics::counter;
use serde_json::Value;
use tracing::warn;

use super::middleware::{Invocation, Middleware, Next};
use super::{CommandHandler, Responder};
use crate::metrics::COMMANDS_TOTAL;

/// Registered commands plus the middleware wrapped around all of them.
///
/// Built once before the server starts, then shared read-only.
pub struct CommandTable<S> {
    handlers: HashMap<String, Arc<dyn CommandHandler<S>>>,
    middleware: Vec<Arc<dyn Middleware<S>>>,
}

impl<S: 'static> CommandTable<S> {
    /// Create an empty table.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            middleware: Vec::new(),
        }
    }

    /// Register `handler` under `name`. A second registration replaces the first.
    pub fn register(&mut self, name: impl Into<String>, handler: impl CommandHandler<S>) -> &mut Self {
        let name = name.into();
        if self.handlers.insert(name.clone(), Arc::new(handler)).is_some() {
            warn!(command = %name, "command registered twice, replacing handler");
        }
        self
    }

    /// Append a middleware. Earlier layers wrap later ones.
    pub fn layer(&mut self, middleware: impl Middleware<S>) -> &mut Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// Whether `name` has a handler.
    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Registered command names, sorted.
    pub fn commands(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered commands.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether no command is registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Run `command` through the middleware chain and its handler.
    pub fn invoke(
        &self,
        command: &str,
        state: &S,
        payload: &Value,
        out: &Responder,
    ) -> Result<(), RouteError> {
        let Some(handler) = self.handlers.get(command) else {
            return Err(RouteError::CommandNotFound(command.to_owned()));
        };
        counter!(COMMANDS_TOTAL, "command" => command.to_owned()).increment(1);

        let cx = Invocation {
            command,
            state,
            payload,
            out,
        };
        Next::new(&self.middleware, handler.as_ref())
            .run(&cx)
            .map_err(|source| RouteError::Handler {
                command: command.to_owned(),
                source,
            })
    }
}

impl<S: 'static> Default for CommandTable<S> {
    fn default() -> Self {
        Self::new()
    }
}
