//! Top-level CLI parser.
//!
//! Defines the root command structure: global options plus the `serve`
//! and `migrate` subcommands.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Command-line interface for the transcription job engine.
#[derive(Parser)]
#[command(name = "transcribe")]
#[command(about = "Run the transcription job engine's HTTP server or database migrations")]
#[command(version)]
pub struct Cli {
    /// Enable verbose/debug logging, overriding `RUST_LOG`.
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP/WS/SSE server.
    Serve {
        /// Port to listen on.
        #[arg(short, long, default_value_t = 8080)]
        port: u16,

        /// Directory of static frontend assets to serve, with an SPA
        /// fallback to `index.html`. Omit to serve the API only.
        #[arg(long)]
        static_dir: Option<PathBuf>,

        /// Allowed CORS origins. Omit to allow any origin.
        #[arg(long)]
        cors_origin: Vec<String>,
    },

    /// Create or update the SQLite schema, then exit.
    Migrate,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_parser_builds() {
        Cli::command().debug_assert();
    }

    #[test]
    fn serve_parses_defaults() {
        let cli = Cli::parse_from(["transcribe", "serve"]);
        match cli.command {
            Commands::Serve { port, static_dir, cors_origin } => {
                assert_eq!(port, 8080);
                assert_eq!(static_dir, None);
                assert!(cors_origin.is_empty());
            }
            Commands::Migrate => panic!("expected Serve"),
        }
    }

    #[test]
    fn migrate_parses() {
        let cli = Cli::parse_from(["transcribe", "migrate"]);
        assert!(matches!(cli.command, Commands::Migrate));
    }
}
