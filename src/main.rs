use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use kubeprobe_k8s::KubeClient;
use kubeprobe_mcp::McpServer;
use kubeprobe_query::QueryDispatcher;
use kubeprobe_types::Encoding;

mod config;

use config::Config;

/// kubeprobe - read-only Kubernetes queries served over the Model Context Protocol
#[derive(Parser, Debug)]
#[command(name = "kubeprobe")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Kubernetes context name (defaults to the current context, then in-cluster config)
    #[arg(long, value_name = "CONTEXT")]
    context: Option<String>,

    /// Encoding for list results: json or yaml
    #[arg(long, value_name = "FORMAT")]
    format: Option<Encoding>,

    /// Config file (defaults to ~/.kubeprobe/config.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref())?;
    if args.context.is_some() {
        config.context = args.context;
    }
    if let Some(format) = args.format {
        config.format = format;
    }
    if let Some(level) = args.log_level {
        config.log_level = level;
    }

    // stdout carries the JSON-RPC stream, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = run(config).await;

    if let Err(e) = &result {
        eprintln!("Error: {:#}", e);
    }

    result
}

async fn run(config: Config) -> Result<()> {
    let client = KubeClient::new(config.context.as_deref()).await?;
    info!(
        context = client.context().unwrap_or("<inferred>"),
        "Kubernetes client configured"
    );

    // Not fatal: each query reports its own cluster errors
    if let Err(e) = client.check_connection().await {
        warn!(error = %e, "cluster connectivity check failed");
    }

    let dispatcher = QueryDispatcher::with_config(Arc::new(client), config.dispatcher_config());
    McpServer::new(Arc::new(dispatcher))
        .run()
        .await
        .context("MCP server failed")
}
