//! Command handlers, one module per subcommand.
//!
//! Handlers are thin: parse/validate CLI-specific input, delegate to
//! `transcribe-axum`/`transcribe-db`, and print operator-facing output.

pub mod migrate;
pub mod serve;
