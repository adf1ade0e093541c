use anyhow::{Context, Result};
use clap::Parser;
use parley_server::{RelayServer, RoomPolicy, router};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Signaling relay for parley calls.
#[derive(Parser)]
#[command(name = "parley-relay")]
struct Args {
    /// Address to listen on.
    #[arg(long, default_value = "0.0.0.0:8000")]
    addr: SocketAddr,

    /// Members allowed per room.
    #[arg(long, default_value_t = 2)]
    room_cap: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();

    let relay = Arc::new(RelayServer::new(RoomPolicy {
        max_members: args.room_cap,
    }));

    let listener = tokio::net::TcpListener::bind(args.addr)
        .await
        .with_context(|| format!("failed to bind {}", args.addr))?;

    info!(addr = %args.addr, room_cap = args.room_cap, "relay listening");

    axum::serve(listener, router(relay))
        .await
        .context("server error")?;

    Ok(())
}
