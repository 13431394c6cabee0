use anyhow::{Context, Result};
use clap::Parser;
use consult_relay::RelayService;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "consult-relay")]
#[command(about = "Best-effort signaling relay with room presence")]
struct Args {
    /// Address to listen on.
    #[arg(long, env = "CONSULT_RELAY_BIND", default_value = "0.0.0.0:8787")]
    bind: SocketAddr,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let listener = TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("Failed to bind {}", args.bind))?;

    RelayService::new()
        .serve(listener)
        .await
        .context("Relay server stopped")?;

    Ok(())
}
