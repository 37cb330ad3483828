use std::collections::HashMap;

use crate::error::Result;
use crate::persist::{decode, encode};
use crate::store::{KvStore, Table, WriteBatch};
use crate::{DocId, PostingList};

/// In-memory postings gathered since the last flush.
#[derive(Debug, Default)]
pub struct PostingAccumulator {
    postings: HashMap<String, PostingList>,
    pending_docs: usize,
}

impl PostingAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the term frequencies of one document. Each doc id is added at most once
    /// per run, so the write never replaces an earlier entry.
    pub fn add_document(&mut self, doc_id: DocId, term_frequencies: &HashMap<String, u32>) {
        for (term, &frequency) in term_frequencies {
            if frequency == 0 {
                continue;
            }
            self.postings.entry(term.clone()).or_default().insert(doc_id, frequency);
        }
        self.pending_docs += 1;
    }

    /// Documents added since the last flush.
    pub fn pending_docs(&self) -> usize {
        self.pending_docs
    }

    pub fn term_count(&self) -> usize {
        self.postings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending_docs == 0 && self.postings.is_empty()
    }

    /// Merge the accumulated postings into the stored lists in one atomic commit,
    /// then clear. On error nothing is written and the accumulator keeps its state.
    pub fn flush<S: KvStore + ?Sized>(&mut self, store: &S) -> Result<usize> {
        if self.postings.is_empty() {
            self.pending_docs = 0;
            return Ok(0);
        }
        let mut batch = WriteBatch::new(Table::Postings);
        for (term, accumulated) in &self.postings {
            let key = term.as_bytes();
            let merged = match store.get(Table::Postings, key)? {
                None => encode(Table::Postings, key, accumulated)?,
                Some(bytes) => {
                    let mut stored: PostingList = decode(Table::Postings, key, &bytes)?;
                    stored.extend(accumulated.iter().map(|(d, f)| (*d, *f)));
                    encode(Table::Postings, key, &stored)?
                }
            };
            batch.put(key, merged);
        }
        let terms = batch.len();
        store.commit(batch)?;
        self.postings.clear();
        self.pending_docs = 0;
        Ok(terms)
    }
}
