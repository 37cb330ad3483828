//! Transactional key/row storage consumed by the indexer and the query engine.
//!
//! Every table is an ordered byte-keyed map. Writes go through a [`WriteBatch`]
//! which is committed atomically: either every operation lands or none does.

use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use crate::error::{IndexError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Table {
    /// term -> encoded posting list
    Postings,
    /// term -> idf
    Dictionary,
    /// doc id -> TF-IDF vector norm
    Lengths,
    /// key -> JSON value
    Metadata,
    /// doc id -> encoded document
    Documents,
    /// doc id -> authority score
    Authority,
}

impl Table {
    pub const ALL: [Table; 6] = [
        Table::Postings,
        Table::Dictionary,
        Table::Lengths,
        Table::Metadata,
        Table::Documents,
        Table::Authority,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Table::Postings => "postings",
            Table::Dictionary => "dictionary",
            Table::Lengths => "lengths",
            Table::Metadata => "metadata",
            Table::Documents => "documents",
            Table::Authority => "authority",
        }
    }
}

/// Pending writes against a single table.
#[derive(Debug)]
pub struct WriteBatch {
    table: Table,
    ops: Vec<(Vec<u8>, Option<Vec<u8>>)>,
}

impl WriteBatch {
    pub fn new(table: Table) -> Self {
        Self { table, ops: Vec::new() }
    }

    pub fn table(&self) -> Table {
        self.table
    }

    pub fn put(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) {
        self.ops.push((key.into(), Some(value.into())));
    }

    pub fn remove(&mut self, key: impl Into<Vec<u8>>) {
        self.ops.push((key.into(), None));
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

pub type KvPair = (Vec<u8>, Vec<u8>);
pub type ScanIter<'a> = Box<dyn Iterator<Item = Result<KvPair>> + 'a>;

pub trait KvStore: Send + Sync {
    fn get(&self, table: Table, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Rows whose key starts with `prefix`, in key order. An empty prefix scans the table.
    fn scan_prefix(&self, table: Table, prefix: &[u8]) -> Result<ScanIter<'_>>;

    /// Apply all operations of `batch` atomically.
    fn commit(&self, batch: WriteBatch) -> Result<()>;

    fn clear(&self, table: Table) -> Result<()>;

    /// Make previous commits durable.
    fn sync(&self) -> Result<()> {
        Ok(())
    }

    fn put(&self, table: Table, key: &[u8], value: &[u8]) -> Result<()> {
        let mut batch = WriteBatch::new(table);
        batch.put(key, value);
        self.commit(batch)
    }
}

impl<S: KvStore + ?Sized> KvStore for std::sync::Arc<S> {
    fn get(&self, table: Table, key: &[u8]) -> Result<Option<Vec<u8>>> {
        (**self).get(table, key)
    }
    fn scan_prefix(&self, table: Table, prefix: &[u8]) -> Result<ScanIter<'_>> {
        (**self).scan_prefix(table, prefix)
    }
    fn commit(&self, batch: WriteBatch) -> Result<()> {
        (**self).commit(batch)
    }
    fn clear(&self, table: Table) -> Result<()> {
        (**self).clear(table)
    }
    fn sync(&self) -> Result<()> {
        (**self).sync()
    }
}

/// sled-backed store, one tree per [`Table`].
pub struct SledStore {
    db: sled::Db,
    trees: HashMap<Table, sled::Tree>,
}

impl SledStore {
    /// Opens or creates a database at `path`, creating every table.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = sled::open(path.as_ref())?;
        Self::from_db(db)
    }

    /// A throwaway database removed on drop.
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: sled::Db) -> Result<Self> {
        let mut trees = HashMap::new();
        for table in Table::ALL {
            trees.insert(table, db.open_tree(table.name())?);
        }
        Ok(Self { db, trees })
    }

    fn tree(&self, table: Table) -> &sled::Tree {
        // every table is opened in from_db
        &self.trees[&table]
    }
}

impl KvStore for SledStore {
    fn get(&self, table: Table, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.tree(table).get(key)?.map(|v| v.to_vec()))
    }

    fn scan_prefix(&self, table: Table, prefix: &[u8]) -> Result<ScanIter<'_>> {
        let iter = self.tree(table).scan_prefix(prefix).map(|entry| {
            entry
                .map(|(k, v)| (k.to_vec(), v.to_vec()))
                .map_err(IndexError::from)
        });
        Ok(Box::new(iter))
    }

    fn commit(&self, batch: WriteBatch) -> Result<()> {
        let mut sled_batch = sled::Batch::default();
        for (key, value) in batch.ops {
            match value {
                Some(v) => sled_batch.insert(key, v),
                None => sled_batch.remove(key),
            }
        }
        self.tree(batch.table).apply_batch(sled_batch)?;
        Ok(())
    }

    fn clear(&self, table: Table) -> Result<()> {
        self.tree(table).clear()?;
        Ok(())
    }

    fn sync(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }
}

/// In-process store over ordered maps.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<Table, BTreeMap<Vec<u8>, Vec<u8>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of a whole table.
    pub fn dump(&self, table: Table) -> BTreeMap<Vec<u8>, Vec<u8>> {
        self.tables.read().get(&table).cloned().unwrap_or_default()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, table: Table, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.tables.read().get(&table).and_then(|t| t.get(key).cloned()))
    }

    fn scan_prefix(&self, table: Table, prefix: &[u8]) -> Result<ScanIter<'_>> {
        let rows: Vec<KvPair> = match self.tables.read().get(&table) {
            Some(t) => t
                .range(prefix.to_vec()..)
                .take_while(|(k, _)| k.starts_with(prefix))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            None => Vec::new(),
        };
        Ok(Box::new(rows.into_iter().map(Ok)))
    }

    fn commit(&self, batch: WriteBatch) -> Result<()> {
        let mut tables = self.tables.write();
        let table = tables.entry(batch.table).or_default();
        for (key, value) in batch.ops {
            match value {
                Some(v) => {
                    table.insert(key, v);
                }
                None => {
                    table.remove(&key);
                }
            }
        }
        Ok(())
    }

    fn clear(&self, table: Table) -> Result<()> {
        self.tables.write().remove(&table);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise(store: &dyn KvStore) {
        let mut batch = WriteBatch::new(Table::Postings);
        batch.put(b"cat".to_vec(), b"1".to_vec());
        batch.put(b"car".to_vec(), b"2".to_vec());
        batch.put(b"dog".to_vec(), b"3".to_vec());
        store.commit(batch).unwrap();

        assert_eq!(store.get(Table::Postings, b"dog").unwrap(), Some(b"3".to_vec()));
        assert_eq!(store.get(Table::Dictionary, b"dog").unwrap(), None);

        let keys: Vec<Vec<u8>> = store
            .scan_prefix(Table::Postings, b"ca")
            .unwrap()
            .map(|r| r.unwrap().0)
            .collect();
        assert_eq!(keys, vec![b"car".to_vec(), b"cat".to_vec()]);

        let mut batch = WriteBatch::new(Table::Postings);
        batch.remove(b"car".to_vec());
        store.commit(batch).unwrap();
        assert_eq!(store.scan_prefix(Table::Postings, b"").unwrap().count(), 2);

        store.clear(Table::Postings).unwrap();
        assert_eq!(store.scan_prefix(Table::Postings, b"").unwrap().count(), 0);
    }

    #[test]
    fn memory_store_semantics() {
        exercise(&MemoryStore::new());
    }

    #[test]
    fn sled_store_semantics() {
        exercise(&SledStore::temporary().unwrap());
    }

    #[test]
    fn sled_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = SledStore::open(dir.path()).unwrap();
            store.put(Table::Metadata, b"k", b"v").unwrap();
            store.sync().unwrap();
        }
        let store = SledStore::open(dir.path()).unwrap();
        assert_eq!(store.get(Table::Metadata, b"k").unwrap(), Some(b"v".to_vec()));
    }
}
