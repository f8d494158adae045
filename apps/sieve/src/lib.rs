//! # Sieve
//!
//! Command-line executor for the sieve-core filtering stage.
//!
//! - `config`: config file loading
//! - `wire`: JSON-lines batch codec
//! - `executor`: concurrent, order-preserving batch runner
//! - `cli`: clap commands

pub mod cli;
pub mod config;
pub mod executor;
pub mod wire;
