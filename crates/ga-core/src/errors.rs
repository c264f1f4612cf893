//! Error taxonomy for message routing and command handling.
//!
//! Every [`RouteError`] is contained by the router: it is logged with the
//! connection id and its [`RouteError::kind`], counted, and never surfaced
//! to the client or to the transport layer.

use thiserror::Error;

/// Error returned by an application command handler.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// The payload was missing a field or had the wrong shape.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
    /// The payload was well-formed but the state refused it.
    #[error("rejected: {0}")]
    Rejected(String),
    /// The handler failed for a reason unrelated to the payload.
    #[error("internal: {0}")]
    Internal(String),
}

impl CommandError {
    /// Machine-readable code for logs and metric labels.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidPayload(_) => "invalid_payload",
            Self::Rejected(_) => "rejected",
            Self::Internal(_) => "internal",
        }
    }
}

/// A frame that the router dropped.
#[derive(Debug, Error)]
pub enum RouteError {
    /// The frame was not valid JSON.
    #[error("invalid payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),

    /// The frame was JSON but carried neither `session` nor `command`.
    #[error("invalid command shape: {0}")]
    InvalidShape(String),

    /// The `session` key named an op the broker does not know.
    #[error("unknown builtin op: {0}")]
    UnknownBuiltin(String),

    /// A command arrived on a connection that has not joined a session.
    #[error("no session bound for command '{command}'")]
    NoSession {
        /// The command that was dropped.
        command: String,
    },

    /// No handler is registered under the command name.
    #[error("command not found: {0}")]
    CommandNotFound(String),

    /// The connection's session was deleted before the command ran.
    #[error("session not found: {0}")]
    SessionNotFound(String),

    /// The handler returned an error.
    #[error("command '{command}' failed: {source}")]
    Handler {
        /// The failing command.
        command: String,
        /// What the handler reported.
        #[source]
        source: CommandError,
    },

    /// The handler panicked.
    #[error("command '{command}' panicked: {message}")]
    HandlerPanicked {
        /// The failing command.
        command: String,
        /// Panic payload, when it was a string.
        message: String,
    },
}

impl RouteError {
    /// Stable machine-readable kind for logs and metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidPayload(_) => "invalid_payload",
            Self::InvalidShape(_) => "invalid_shape",
            Self::UnknownBuiltin(_) => "unknown_builtin",
            Self::NoSession { .. } => "no_session",
            Self::CommandNotFound(_) => "command_not_found",
            Self::SessionNotFound(_) => "session_not_found",
            Self::Handler { .. } => "handler_error",
            Self::HandlerPanicked { .. } => "handler_panicked",
        }
    }

    /// Whether this is a fault inside application code rather than a
    /// protocol or routing problem.
    pub fn is_handler_fault(&self) -> bool {
        matches!(self, Self::Handler { .. } | Self::HandlerPanicked { .. })
    }
}
