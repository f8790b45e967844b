//! Conveyor Core
//!
//! Core types and abstractions for the Conveyor deployment pipeline engine.
//!
//! This crate contains:
//! - Domain types: Core business entities (Pipeline, Stage, Snapshot, Device, etc.)
//! - DTOs: Data transfer objects for the orchestrator HTTP surface
//! - Credentials: the symmetric cipher protecting snapshot credentials

pub mod credentials;
pub mod domain;
pub mod dto;
