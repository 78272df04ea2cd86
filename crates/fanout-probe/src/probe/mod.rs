//! Probe internals.
//!
//! ## Structure
//!
//! - [`config`] - CLI/environment configuration.
//! - [`registry`] - loading worker records from disk.
//! - [`health`] - the health-check fan-out and its report.
//! - [`telemetry`] - log subscriber setup.

pub mod config;
pub mod health;
pub mod registry;
pub mod telemetry;
