// cardio-triage/crates/cardio-triage/src/main.rs

#[cfg(feature = "cli")]
use cardio_triage::{config::Config, run_server};
#[cfg(feature = "cli")]
use clap::Parser;

/// Cardiology triage chat server.
#[cfg(feature = "cli")]
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Address to bind, overrides API_HOST.
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, overrides API_PORT.
    #[arg(long)]
    port: Option<u16>,

    /// Extra .env file loaded before the environment is read.
    #[arg(long)]
    env_file: Option<std::path::PathBuf>,
}

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    cardio_triage::telemetry::init_tracing();
    if let Some(path) = &args.env_file {
        dotenvy::from_path(path)
            .map_err(|e| anyhow::anyhow!("Failed to load {}: {}", path.display(), e))?;
    }

    let mut cfg = Config::from_env()?;
    if let Some(host) = args.host {
        cfg.api_host = host;
    }
    if let Some(port) = args.port {
        cfg.api_port = port;
    }

    run_server(cfg).await
}

#[cfg(not(feature = "cli"))]
fn main() {
    println!("CLI feature not enabled. Enable with --features cli");
}
