//! Argument parsing and output for the `tdsnmp-get` and `tdsnmp-walk` tools.
//!
//! Only built with the `cli` feature.

pub mod args;
pub mod output;
