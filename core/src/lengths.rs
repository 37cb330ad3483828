use std::collections::{BTreeMap, HashMap};
use tracing::info;

use crate::error::Result;
use crate::index::tf_weight;
use crate::persist::{doc_key, encode, scan_posting_lists};
use crate::store::{KvStore, Table, WriteBatch};
use crate::DocId;

/// Recompute every ingested document's TF-IDF norm from the persisted postings.
///
/// The posting table is inverted in one term-ordered scan holding a single decoded
/// list at a time, so the result depends only on the final merged lists and not on
/// how they were batched. Documents in
/// `ingested` without any posting get length 0.
pub fn compute_lengths<S: KvStore + ?Sized>(
    store: &S,
    dictionary: &HashMap<String, f64>,
    ingested: &[DocId],
) -> Result<BTreeMap<DocId, f64>> {
    let mut squares: BTreeMap<DocId, f64> = ingested.iter().map(|&d| (d, 0.0)).collect();

    for row in scan_posting_lists(store)? {
        let (term, postings) = row?;
        let idf = dictionary.get(&term).copied().unwrap_or(0.0);
        for (doc_id, frequency) in postings {
            let weight = tf_weight(frequency) * idf;
            *squares.entry(doc_id).or_insert(0.0) += weight * weight;
        }
    }

    let mut batch = WriteBatch::new(Table::Lengths);
    let mut lengths = BTreeMap::new();
    for (doc_id, sum) in squares {
        let length = sum.sqrt();
        let key = doc_key(doc_id);
        batch.put(key, encode(Table::Lengths, &key, &length)?);
        lengths.insert(doc_id, length);
    }
    store.commit(batch)?;
    info!(documents = lengths.len(), "document lengths written");
    Ok(lengths)
}
