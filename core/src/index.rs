use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type DocId = u32;

/// Raw term frequencies of one term, keyed by document. Entries are always >= 1.
pub type PostingList = BTreeMap<DocId, u32>;

/// A crawled document as handed over by the document store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub doc_id: DocId,
    pub url: String,
    pub title: String,
    pub body: String,
    /// Link-authority (pagerank) score computed by the crawler.
    #[serde(default)]
    pub authority: f64,
}

/// Persisted index metadata. `total_docs` is only present once a run completed.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexMeta {
    pub total_docs: u32,
    pub created_at: Option<String>,
    pub format_version: Option<u32>,
}

/// Dampened term-frequency weight: `1 + log10(tf)`, or 0 when the term is absent.
pub fn tf_weight(frequency: u32) -> f64 {
    if frequency > 0 {
        1.0 + (frequency as f64).log10()
    } else {
        0.0
    }
}

/// `log10(total_docs / document_frequency)`.
pub fn idf(total_docs: u32, document_frequency: u32) -> f64 {
    (total_docs as f64 / document_frequency.max(1) as f64).log10()
}
