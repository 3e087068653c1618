//! CLI for the transcription job engine: `serve` runs the HTTP server,
//! `migrate` applies the SQLite schema standalone.
#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

// Used by the `transcribe` binary (main.rs), not by this library target.
use dotenvy as _;
use tokio as _;
use tracing as _;
use tracing_subscriber as _;

#[cfg(test)]
use tokio_test as _;

pub mod bootstrap;
pub mod error;
pub mod handlers;
pub mod parser;

pub use error::CliError;
pub use parser::{Cli, Commands};
