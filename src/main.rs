// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use clap::Parser;
use dotenv::dotenv;
use tracing::info;
use tracing_subscriber::EnvFilter;

use readbuddy_node::api::start_server;
use readbuddy_node::config::NodeConfig;

/// Backend node for indexing documents into a vector store and chatting
/// over them with streamed answers.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Address to listen on, overrides LISTEN_ADDR
    #[arg(long)]
    listen: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let mut config = NodeConfig::from_env()?;
    if let Some(listen) = args.listen {
        config.listen_addr = listen;
    }

    info!(
        "Starting readbuddy-node v{} on {}",
        env!("CARGO_PKG_VERSION"),
        config.listen_addr
    );

    start_server(config).await
}
