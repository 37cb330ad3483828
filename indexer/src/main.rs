use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use search_core::{Collection, Indexer, IndexerConfig, KvStore, SequentialScan, SledStore, TextPipeline};
use tracing_subscriber::{fmt, EnvFilter};

use std::path::PathBuf;

mod load;

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Load crawled documents and build the TF-IDF index", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import crawler output (JSON/JSONL file or directory) into a document collection
    Load {
        /// Input path (file or directory)
        #[arg(long)]
        input: PathBuf,
        /// Document collection directory
        #[arg(long, default_value = "./out/collection")]
        collection: PathBuf,
    },
    /// Index every document of a collection
    Build {
        /// Document collection directory
        #[arg(long, default_value = "./out/collection")]
        collection: PathBuf,
        /// Output index directory
        #[arg(long, default_value = "./out/index")]
        index: PathBuf,
        /// Documents to accumulate before merging postings into storage
        #[arg(long, default_value_t = search_core::config::DEFAULT_FLUSH_THRESHOLD)]
        flush_threshold: usize,
        /// Newline-delimited stop-word list replacing the built-in one
        #[arg(long)]
        stopwords: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Load { input, collection } => {
            let store = SledStore::open(&collection)
                .with_context(|| format!("opening collection at {}", collection.display()))?;
            let collection = Collection::new(store);
            let summary = load::load_collection(&input, &collection)?;
            collection.store().sync()?;
            tracing::info!(loaded = summary.loaded, rejected = summary.rejected, "collection loaded");
            Ok(())
        }
        Commands::Build { collection, index, flush_threshold, stopwords } => {
            let pipeline = match stopwords {
                Some(path) => TextPipeline::from_stopwords_file(&path)
                    .with_context(|| format!("reading stop words from {}", path.display()))?,
                None => TextPipeline::new(),
            };
            let documents = Collection::new(
                SledStore::open(&collection)
                    .with_context(|| format!("opening collection at {}", collection.display()))?,
            );
            let store = SledStore::open(&index)
                .with_context(|| format!("creating index at {}", index.display()))?;
            Indexer::new(&store, &pipeline, IndexerConfig { flush_threshold })
                .run(&mut SequentialScan::new(&documents))
                .with_context(|| format!("building index at {}", index.display()))?;
            Ok(())
        }
    }
}
