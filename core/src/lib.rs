//! TF-IDF indexing and cosine ranking over a crawled document collection.

pub mod accumulator;
pub mod collection;
pub mod config;
pub mod dictionary;
pub mod error;
pub mod index;
pub mod indexer;
pub mod lengths;
pub mod persist;
pub mod query;
pub mod store;
pub mod tokenizer;

pub use collection::{Collection, DocumentSource, DocumentStore, NextDocument, SequentialScan};
pub use config::{IndexerConfig, RankingConfig, TOP_K};
pub use error::{IndexError, Result};
pub use index::{DocId, Document, IndexMeta, PostingList};
pub use indexer::{IndexSummary, Indexer, IndexingSession, Phase};
pub use query::{QueryEngine, SearchHit};
pub use store::{KvStore, MemoryStore, SledStore, Table, WriteBatch};
pub use tokenizer::TextPipeline;
