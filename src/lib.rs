//! Telemux - runtime telemetry tailing and event orchestration for agent sessions
//!
//! This library crate exposes internal modules for integration testing.

pub mod config;
pub mod data;
pub mod integrations;
pub mod orchestrator;
pub mod telemetry;
pub mod util;
