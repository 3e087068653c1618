//! CLI entry point.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use transcribe_cli::bootstrap::{load_and_validate_settings, ServeArgs};
use transcribe_cli::{handlers, Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Serve { port, static_dir, cors_origin } => {
            let args = ServeArgs {
                port,
                static_dir,
                cors_origins: cors_origin,
            };
            handlers::serve::execute(args).await?;
        }
        Commands::Migrate => {
            let settings = load_and_validate_settings()?;
            handlers::migrate::execute(&settings).await?;
        }
    }

    Ok(())
}
