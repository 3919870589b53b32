//! apiprobe - declarative HTTP API conformance testing
//!
//! Describes HTTP probes as data, runs them in order against one server with
//! shared cookie sessions, and reports a categorised pass/fail ledger.

pub mod cli;
pub mod commands;
pub mod common;
pub mod harness;
pub mod http;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use harness::{Category, Ledger, Probe, Scenario, ScenarioRunner};
