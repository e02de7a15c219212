//! Shared helpers for the integration tests.

// Each test binary uses a different subset.
#![allow(dead_code)]

mod agent;
mod fixtures;

pub use agent::Agent;
pub use fixtures::*;
