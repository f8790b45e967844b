//! Core domain types
//!
//! This module contains the core domain structures of the deployment pipeline engine.
//! They are shared between the orchestrator (persistence and deploy logic) and the
//! client/CLI (display).

pub mod application;
pub mod device;
pub mod instance;
pub mod pipeline;
pub mod snapshot;
pub mod target;
