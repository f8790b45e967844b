//! Data Transfer Objects
//!
//! Request and response shapes of the orchestrator HTTP API, shared by the
//! orchestrator, the client library and the CLI.

pub mod command;
pub mod pipeline;
pub mod snapshot;
pub mod status;
