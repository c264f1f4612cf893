//! # ga-broker
//!
//! Real-time session broker for GA front ends.
//!
//! Clients connect over WebSocket, join a named session, and send JSON
//! commands. Builtin `session` ops manage membership; every other frame
//! with a `command` key is dispatched to a handler registered in a
//! [`CommandTable`], which mutates that session's state and replies to the
//! sender or broadcasts to everyone in the session.
//!
//! - [`Broker`]: both registries plus the command table, driven through
//!   `on_connect` / `on_message` / `on_close`
//! - [`GaServer`]: Axum front end serving `/ws`, `/health` and `/metrics`

#![deny(unsafe_code)]

pub mod broker;
pub mod commands;
pub mod config;
pub mod connection;
pub mod health;
pub mod metrics;
mod protocol;
pub mod registry;
mod router;
pub mod server;
pub mod shutdown;
pub mod websocket;

pub use broker::{Broker, ServerInfo};
pub use commands::{CommandHandler, CommandTable, Middleware, Responder, TraceCommands};
pub use config::ServerConfig;
pub use server::{GaServer, ServerError};
