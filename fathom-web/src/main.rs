//! Fathom web server binary

use clap::Parser;
use fathom_web::{init_logging, FathomServer, WebConfig};
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "fathom-web")]
#[command(about = "HTTP server for Fathom deep research sessions")]
#[command(version)]
struct Args {
    /// Host to bind to (overrides FATHOM_HOST)
    #[arg(long)]
    host: Option<String>,

    /// Port to bind to (overrides FATHOM_PORT)
    #[arg(long)]
    port: Option<u16>,

    /// Enable development mode
    #[arg(long)]
    dev: bool,

    /// Path to an engine configuration file (overrides FATHOM_CONFIG)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    std::env::set_var(
        "RUST_LOG",
        format!(
            "fathom_web={level},fathom_engine={level},fathom_agents={level},fathom_search={level},tower_http=debug",
            level = args.log_level
        ),
    );
    init_logging();

    // Pick up API keys from a local .env if present
    dotenvy::dotenv().ok();

    let mut config = WebConfig::from_env();
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if args.dev {
        config.dev_mode = true;
    }
    if let Some(path) = args.config {
        config.config_path = Some(path);
    }

    println!("🔍 Fathom deep research server");
    println!("🚀 Starting on http://{}", config.address());
    #[cfg(feature = "openapi")]
    println!("📚 OpenAPI spec at http://{}/api/openapi.json", config.address());

    if std::env::var("OPENAI_API_KEY").is_err() && std::env::var("ANTHROPIC_API_KEY").is_err() {
        println!("⚠️  No LLM API key found (OPENAI_API_KEY or ANTHROPIC_API_KEY)");
        println!("   Query planning, evaluation, and synthesis will fail without one");
    }
    if std::env::var("EXA_API_KEY").is_err() {
        println!("⚠️  EXA_API_KEY not set; web searches will be rejected");
    }

    let server = FathomServer::new(config);
    if let Err(e) = server.start().await {
        eprintln!("❌ Server error: {e}");
        process::exit(1);
    }
}
