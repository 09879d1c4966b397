//! trialfold library crate — re-exports for integration tests.
//!
//! The primary interface is the `trialfold` binary. This lib.rs exposes
//! internal modules so that integration tests can exercise the merge engine,
//! stores, and model types directly without going through the CLI.

pub mod config;
pub mod error;
pub mod job;
pub mod merge;
pub mod model;
pub mod store;
pub mod telemetry;
pub mod xml;
