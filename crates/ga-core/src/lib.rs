//! # ga-core
//!
//! Shared vocabulary for the GA session broker.
//!
//! - **Ids**: [`ids::ConnectionId`], a branded UUID v7 newtype
//! - **Errors**: [`errors::RouteError`] for everything the router contains,
//!   [`errors::CommandError`] for what command handlers return
//! - **Wire**: classification of inbound envelopes and the builtin replies
//! - **Logging**: subscriber bootstrap and log capture for tests

#![deny(unsafe_code)]

pub mod errors;
pub mod ids;
pub mod logging;
pub mod wire;

pub use errors::{CommandError, RouteError};
pub use ids::ConnectionId;
