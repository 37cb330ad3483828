use anyhow::Result;
use axum::Router;
use clap::Parser;
use search_core::config::{DEFAULT_AUTHORITY_WEIGHT, DEFAULT_COSINE_WEIGHT};
use search_core::RankingConfig;
use server::{build_app, ServerConfig};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// Index directory path
    #[arg(long, default_value = "./out/index")]
    index: PathBuf,
    /// Document collection directory path
    #[arg(long, default_value = "./out/collection")]
    collection: PathBuf,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
    /// Weight of cosine similarity in the final score
    #[arg(long, default_value_t = DEFAULT_COSINE_WEIGHT)]
    cosine_weight: f64,
    /// Weight of the authority (pagerank) score in the final score
    #[arg(long, default_value_t = DEFAULT_AUTHORITY_WEIGHT)]
    authority_weight: f64,
    /// Stop-word list; must match the one used to build the index
    #[arg(long)]
    stopwords: Option<PathBuf>,
    /// Per-query time limit in milliseconds
    #[arg(long, default_value_t = 2000)]
    query_timeout_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();
    let config = ServerConfig {
        index_dir: args.index,
        collection_dir: args.collection,
        ranking: RankingConfig::new(args.cosine_weight, args.authority_weight),
        stopwords: args.stopwords,
        query_timeout: Duration::from_millis(args.query_timeout_ms),
    };
    let app: Router = build_app(&config)?;

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
