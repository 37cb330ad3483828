//! The document store collaborator: crawled documents keyed by dense doc ids,
//! plus their authority scores.

use crate::error::{IndexError, Result};
use crate::persist::{doc_key, encode, load_authority, load_document};
use crate::store::{KvStore, Table, WriteBatch};
use crate::{DocId, Document};

pub trait DocumentStore: Send + Sync {
    fn get_document(&self, doc_id: DocId) -> Result<Option<Document>>;

    /// Authority (pagerank) score, 0 when unknown.
    fn authority_score(&self, doc_id: DocId) -> Result<f64>;
}

/// Outcome of asking a source for its next document.
#[derive(Debug)]
pub enum NextDocument {
    Ready(Document),
    /// The slot exists but could not be read; the source has moved past it.
    Unavailable { doc_id: DocId, error: IndexError },
    /// The source itself broke; no further documents can be read.
    Failed(IndexError),
    EndOfCorpus,
}

/// Enumerates a corpus in increasing doc id order.
pub trait DocumentSource {
    fn next_document(&mut self) -> NextDocument;
}

/// Walks a [`DocumentStore`] by probing ids 1, 2, 3, ... until one is missing.
///
/// A row that fails to decode is skipped. Any other store error ends the scan
/// with [`NextDocument::Failed`].
pub struct SequentialScan<'a, D: DocumentStore + ?Sized> {
    store: &'a D,
    /// `None` once the id space is exhausted.
    next_id: Option<DocId>,
}

impl<'a, D: DocumentStore + ?Sized> SequentialScan<'a, D> {
    pub fn new(store: &'a D) -> Self {
        Self { store, next_id: Some(1) }
    }
}

impl<D: DocumentStore + ?Sized> DocumentSource for SequentialScan<'_, D> {
    fn next_document(&mut self) -> NextDocument {
        let Some(doc_id) = self.next_id else {
            return NextDocument::EndOfCorpus;
        };
        match self.store.get_document(doc_id) {
            Ok(Some(doc)) => {
                self.next_id = doc_id.checked_add(1);
                NextDocument::Ready(doc)
            }
            Ok(None) => NextDocument::EndOfCorpus,
            Err(error @ IndexError::Codec { .. }) => {
                self.next_id = doc_id.checked_add(1);
                NextDocument::Unavailable { doc_id, error }
            }
            Err(error) => NextDocument::Failed(error),
        }
    }
}

/// A [`DocumentStore`] persisted in the `documents` and `authority` tables of a [`KvStore`].
pub struct Collection<S> {
    store: S,
}

impl<S: KvStore> Collection<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Remove every document and authority score.
    pub fn reset(&self) -> Result<()> {
        self.store.clear(Table::Documents)?;
        self.store.clear(Table::Authority)
    }

    /// Store a batch of documents, each with its authority score.
    pub fn insert_all(&self, docs: &[Document]) -> Result<()> {
        let mut documents = WriteBatch::new(Table::Documents);
        let mut authority = WriteBatch::new(Table::Authority);
        for doc in docs {
            let key = doc_key(doc.doc_id);
            documents.put(key, encode(Table::Documents, &key, doc)?);
            authority.put(key, encode(Table::Authority, &key, &doc.authority)?);
        }
        self.store.commit(documents)?;
        self.store.commit(authority)
    }

    pub fn insert(&self, doc: &Document) -> Result<()> {
        self.insert_all(std::slice::from_ref(doc))
    }

    pub fn len(&self) -> Result<usize> {
        let mut n = 0;
        for row in self.store.scan_prefix(Table::Documents, b"")? {
            row?;
            n += 1;
        }
        Ok(n)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl<S: KvStore> DocumentStore for Collection<S> {
    fn get_document(&self, doc_id: DocId) -> Result<Option<Document>> {
        load_document(&self.store, doc_id)
    }

    fn authority_score(&self, doc_id: DocId) -> Result<f64> {
        Ok(load_authority(&self.store, doc_id)?.unwrap_or(0.0))
    }
}
