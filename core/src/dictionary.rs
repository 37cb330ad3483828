use std::collections::HashMap;
use tracing::info;

use crate::error::{IndexError, Result};
use crate::index::idf;
use crate::persist::encode;
use crate::store::{KvStore, Table, WriteBatch};

/// Derive and persist `term -> idf` from the run's document frequencies.
///
/// Runs once, after the last posting flush. All entries are written in one commit.
pub fn build_dictionary<S: KvStore + ?Sized>(
    store: &S,
    document_frequency: &HashMap<String, u32>,
    total_docs: u32,
) -> Result<HashMap<String, f64>> {
    if total_docs == 0 {
        return Err(IndexError::EmptyCorpus);
    }
    let mut dictionary = HashMap::with_capacity(document_frequency.len());
    let mut batch = WriteBatch::new(Table::Dictionary);
    for (term, &df) in document_frequency {
        let weight = idf(total_docs, df);
        batch.put(term.as_bytes(), encode(Table::Dictionary, term.as_bytes(), &weight)?);
        dictionary.insert(term.clone(), weight);
    }
    store.commit(batch)?;
    info!(terms = dictionary.len(), total_docs, "dictionary written");
    Ok(dictionary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::load_idf;
    use crate::store::MemoryStore;

    #[test]
    fn idf_follows_document_frequency() {
        let store = MemoryStore::new();
        let df: HashMap<String, u32> = [("cat".to_string(), 2), ("love".to_string(), 3)].into();
        let dict = build_dictionary(&store, &df, 3).unwrap();

        assert_eq!(dict["love"], 0.0);
        let cat = load_idf(&store, "cat").unwrap().unwrap();
        assert!((cat - (1.5f64).log10()).abs() < 1e-12);
    }

    #[test]
    fn rejects_empty_corpus() {
        let store = MemoryStore::new();
        assert!(matches!(
            build_dictionary(&store, &HashMap::new(), 0),
            Err(IndexError::EmptyCorpus)
        ));
    }
}
