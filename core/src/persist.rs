use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use time::format_description::well_known::Rfc3339;

use crate::error::{IndexError, Result};
use crate::store::{KvStore, Table, WriteBatch};
use crate::{DocId, Document, IndexMeta, PostingList};

pub const FORMAT_VERSION: u32 = 1;

pub const META_TOTAL_DOCS: &str = "totalDocs";
pub const META_CREATED_AT: &str = "createdAt";
pub const META_FORMAT_VERSION: &str = "formatVersion";

pub fn doc_key(doc_id: DocId) -> [u8; 4] {
    doc_id.to_be_bytes()
}

pub fn decode_doc_key(key: &[u8]) -> Option<DocId> {
    let bytes: [u8; 4] = key.try_into().ok()?;
    Some(DocId::from_be_bytes(bytes))
}

fn display_key(key: &[u8]) -> String {
    match decode_doc_key(key) {
        Some(id) if std::str::from_utf8(key).is_err() => id.to_string(),
        _ => String::from_utf8_lossy(key).into_owned(),
    }
}

pub fn encode<T: Serialize>(table: Table, key: &[u8], value: &T) -> Result<Vec<u8>> {
    bincode::serialize(value).map_err(|source| IndexError::Codec {
        table: table.name(),
        key: display_key(key),
        source,
    })
}

pub fn decode<T: DeserializeOwned>(table: Table, key: &[u8], bytes: &[u8]) -> Result<T> {
    bincode::deserialize(bytes).map_err(|source| IndexError::Codec {
        table: table.name(),
        key: display_key(key),
        source,
    })
}

// --- postings ---

pub fn load_posting_list<S: KvStore + ?Sized>(store: &S, term: &str) -> Result<Option<PostingList>> {
    match store.get(Table::Postings, term.as_bytes())? {
        Some(bytes) => Ok(Some(decode(Table::Postings, term.as_bytes(), &bytes)?)),
        None => Ok(None),
    }
}

/// Every stored posting list, in term order, decoded one row at a time.
pub fn scan_posting_lists<S: KvStore + ?Sized>(
    store: &S,
) -> Result<impl Iterator<Item = Result<(String, PostingList)>> + '_> {
    let rows = store.scan_prefix(Table::Postings, b"")?;
    Ok(rows.map(|row| {
        let (key, bytes) = row?;
        let postings: PostingList = decode(Table::Postings, &key, &bytes)?;
        Ok((String::from_utf8_lossy(&key).into_owned(), postings))
    }))
}

// --- dictionary ---

pub fn load_idf<S: KvStore + ?Sized>(store: &S, term: &str) -> Result<Option<f64>> {
    match store.get(Table::Dictionary, term.as_bytes())? {
        Some(bytes) => Ok(Some(decode(Table::Dictionary, term.as_bytes(), &bytes)?)),
        None => Ok(None),
    }
}

pub fn load_dictionary<S: KvStore + ?Sized>(store: &S) -> Result<HashMap<String, f64>> {
    let mut dictionary = HashMap::new();
    for row in store.scan_prefix(Table::Dictionary, b"")? {
        let (key, bytes) = row?;
        let idf: f64 = decode(Table::Dictionary, &key, &bytes)?;
        dictionary.insert(String::from_utf8_lossy(&key).into_owned(), idf);
    }
    Ok(dictionary)
}

// --- lengths ---

pub fn load_length<S: KvStore + ?Sized>(store: &S, doc_id: DocId) -> Result<Option<f64>> {
    let key = doc_key(doc_id);
    match store.get(Table::Lengths, &key)? {
        Some(bytes) => Ok(Some(decode(Table::Lengths, &key, &bytes)?)),
        None => Ok(None),
    }
}

// --- documents ---

pub fn load_document<S: KvStore + ?Sized>(store: &S, doc_id: DocId) -> Result<Option<Document>> {
    let key = doc_key(doc_id);
    match store.get(Table::Documents, &key)? {
        Some(bytes) => Ok(Some(decode(Table::Documents, &key, &bytes)?)),
        None => Ok(None),
    }
}

pub fn load_authority<S: KvStore + ?Sized>(store: &S, doc_id: DocId) -> Result<Option<f64>> {
    let key = doc_key(doc_id);
    match store.get(Table::Authority, &key)? {
        Some(bytes) => Ok(Some(decode(Table::Authority, &key, &bytes)?)),
        None => Ok(None),
    }
}

// --- metadata ---

fn load_meta_value<S: KvStore + ?Sized, T: DeserializeOwned>(store: &S, key: &str) -> Result<Option<T>> {
    match store.get(Table::Metadata, key.as_bytes())? {
        Some(bytes) => serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| IndexError::Metadata { key: key.to_string(), source }),
        None => Ok(None),
    }
}

/// Write the completion metadata in one commit. Its presence marks the index queryable.
pub fn save_meta<S: KvStore + ?Sized>(store: &S, total_docs: u32) -> Result<()> {
    let created_at = time::OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default();
    let mut batch = WriteBatch::new(Table::Metadata);
    let entries = [
        (META_TOTAL_DOCS, serde_json::json!(total_docs)),
        (META_CREATED_AT, serde_json::json!(created_at)),
        (META_FORMAT_VERSION, serde_json::json!(FORMAT_VERSION)),
    ];
    for (key, value) in entries {
        let bytes = serde_json::to_vec(&value)
            .map_err(|source| IndexError::Metadata { key: key.to_string(), source })?;
        batch.put(key.as_bytes(), bytes);
    }
    store.commit(batch)
}

/// `None` when no indexing run has completed against this store.
pub fn load_meta<S: KvStore + ?Sized>(store: &S) -> Result<Option<IndexMeta>> {
    let Some(total_docs) = load_meta_value::<S, u32>(store, META_TOTAL_DOCS)? else {
        return Ok(None);
    };
    Ok(Some(IndexMeta {
        total_docs,
        created_at: load_meta_value(store, META_CREATED_AT)?,
        format_version: load_meta_value(store, META_FORMAT_VERSION)?,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn malformed_posting_list_is_an_error() {
        let store = MemoryStore::new();
        store.put(Table::Postings, b"cat", &[0xff]).unwrap();
        let err = load_posting_list(&store, "cat").unwrap_err();
        assert!(matches!(err, IndexError::Codec { table: "postings", .. }));
    }

    #[test]
    fn posting_scan_yields_rows_in_term_order_and_surfaces_bad_rows() {
        let store = MemoryStore::new();
        let cat: PostingList = [(1, 2)].into();
        store.put(Table::Postings, b"cat", &bincode::serialize(&cat).unwrap()).unwrap();
        store.put(Table::Postings, b"dog", &[0xff]).unwrap();

        let mut rows = scan_posting_lists(&store).unwrap();
        let (term, list) = rows.next().unwrap().unwrap();
        assert_eq!((term.as_str(), list), ("cat", cat));
        assert!(matches!(rows.next(), Some(Err(IndexError::Codec { table: "postings", .. }))));
        assert!(rows.next().is_none());
    }

    #[test]
    fn meta_is_absent_until_saved() {
        let store = MemoryStore::new();
        assert!(load_meta(&store).unwrap().is_none());
        save_meta(&store, 42).unwrap();
        let meta = load_meta(&store).unwrap().unwrap();
        assert_eq!(meta.total_docs, 42);
        assert_eq!(meta.format_version, Some(FORMAT_VERSION));
        assert!(meta.created_at.is_some());
    }

    #[test]
    fn doc_keys_sort_numerically() {
        assert!(doc_key(2) < doc_key(10));
        assert_eq!(decode_doc_key(&doc_key(77)), Some(77));
        assert_eq!(decode_doc_key(b"abc"), None);
    }
}
