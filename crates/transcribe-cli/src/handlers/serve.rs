//! `serve` command handler — starts the HTTP/WS/SSE server.

use anyhow::Result;

use crate::bootstrap::ServeArgs;

pub async fn execute(args: ServeArgs) -> Result<()> {
    let config = args.into_server_config();

    println!();
    println!("  transcription engine starting...");
    if let Some(ref dir) = config.static_dir {
        println!("  serving UI from: {}", dir.display());
        println!("  local:   http://localhost:{}", config.port);
    } else {
        println!("  API only: http://localhost:{}", config.port);
        println!("  (pass --static-dir to also serve a frontend build)");
    }
    println!("  press Ctrl+C to stop");
    println!();

    transcribe_axum::start_server(config).await
}

#[cfg(test)]
mod tests {
    #[test]
    fn serve_handler_module_compiles() {}
}
