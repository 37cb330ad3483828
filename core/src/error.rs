use crate::DocId;

pub type Result<T> = std::result::Result<T, IndexError>;

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed row in `{table}` for key {key}: {source}")]
    Codec {
        table: &'static str,
        key: String,
        #[source]
        source: bincode::Error,
    },

    #[error("malformed metadata value for `{key}`: {source}")]
    Metadata {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("index is incomplete: metadata key `totalDocs` is missing")]
    Incomplete,

    #[error("no stored length for document {0}")]
    MissingLength(DocId),

    #[error("document {0} not found")]
    DocumentNotFound(DocId),

    #[error("corpus is empty: document 1 was not found")]
    EmptyCorpus,

    #[error("invalid configuration: {0}")]
    Config(String),
}
