use anyhow::{Context, Result};
use clap::Parser;
use sitesearch_core::{Highlighter, SearchIndex};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "server", about = "Serve search queries over a built index")]
struct Args {
    /// Index directory written by `crawler` or `indexer build`
    #[arg(long, default_value = "./data/index")]
    index: PathBuf,
    #[arg(long, default_value = "0.0.0.0:8080")]
    bind: SocketAddr,
    /// Markup placed before each highlighted query match
    #[arg(long, default_value = "<em>")]
    highlight_open: String,
    #[arg(long, default_value = "</em>")]
    highlight_close: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();

    let index = SearchIndex::open_existing(&args.index)
        .with_context(|| format!("opening index at {}", args.index.display()))?
        .with_highlighter(Highlighter::new(args.highlight_open, args.highlight_close));
    tracing::info!(index = %args.index.display(), num_docs = index.len(), num_terms = index.num_terms(), "index loaded");
    let app = server::build_app_with_index(index);

    let listener = TcpListener::bind(args.bind).await?;
    tracing::info!(addr = %args.bind, "server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %err, "failed to listen for shutdown signal");
            }
            tracing::info!("shutting down");
        })
        .await?;
    Ok(())
}
