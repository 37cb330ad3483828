//! Indexing run: ingest a corpus, then derive the dictionary and document lengths.
//!
//! `Init -> Ingesting -> Finalizing -> Done`; any storage failure moves the run to
//! `Failed`. The `totalDocs` metadata key is written last, so a run that did not
//! reach `Done` never looks queryable.

use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::accumulator::PostingAccumulator;
use crate::collection::{DocumentSource, NextDocument};
use crate::config::IndexerConfig;
use crate::dictionary::build_dictionary;
use crate::error::{IndexError, Result};
use crate::lengths::compute_lengths;
use crate::persist::save_meta;
use crate::store::{KvStore, Table};
use crate::tokenizer::TextPipeline;
use crate::{DocId, Document};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Init,
    Ingesting,
    Finalizing,
    Done,
    Failed,
}

/// Per-run accumulation state. Nothing here outlives one run.
#[derive(Debug, Default)]
pub struct IndexingSession {
    pub accumulator: PostingAccumulator,
    /// Documents containing each term; never cleared by a flush.
    pub document_frequency: HashMap<String, u32>,
    pub ingested: Vec<DocId>,
    pub skipped: usize,
    pub last_doc_id: DocId,
    pub flushes: usize,
}

impl IndexingSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tokenize a document body and add it to the accumulator.
    pub fn ingest(&mut self, pipeline: &TextPipeline, doc: &Document) {
        let frequencies = pipeline.term_frequencies(&doc.body);
        debug!(doc_id = doc.doc_id, terms = frequencies.len(), "indexing document");
        self.accumulator.add_document(doc.doc_id, &frequencies);
        for term in frequencies.into_keys() {
            *self.document_frequency.entry(term).or_insert(0) += 1;
        }
        self.ingested.push(doc.doc_id);
        self.last_doc_id = self.last_doc_id.max(doc.doc_id);
    }

    pub fn flush<S: KvStore + ?Sized>(&mut self, store: &S) -> Result<()> {
        let docs = self.accumulator.pending_docs();
        let terms = self.accumulator.flush(store)?;
        self.flushes += 1;
        info!(docs, terms, flush = self.flushes, "flushed postings");
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSummary {
    pub total_docs: u32,
    pub indexed_docs: usize,
    pub skipped_docs: usize,
    pub terms: usize,
    pub flushes: usize,
}

pub struct Indexer<'a, S: KvStore + ?Sized> {
    store: &'a S,
    pipeline: &'a TextPipeline,
    config: IndexerConfig,
    phase: Phase,
}

impl<'a, S: KvStore + ?Sized> Indexer<'a, S> {
    pub fn new(store: &'a S, pipeline: &'a TextPipeline, config: IndexerConfig) -> Self {
        Self { store, pipeline, config, phase: Phase::Init }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    fn enter(&mut self, phase: Phase) {
        info!(from = ?self.phase, to = ?phase, "indexing phase");
        self.phase = phase;
    }

    /// Run a full indexing pass over `source`.
    pub fn run<D: DocumentSource + ?Sized>(&mut self, source: &mut D) -> Result<IndexSummary> {
        match self.try_run(source) {
            Ok(summary) => Ok(summary),
            Err(e) => {
                warn!(error = %e, phase = ?self.phase, "indexing failed");
                self.phase = Phase::Failed;
                Err(e)
            }
        }
    }

    fn try_run<D: DocumentSource + ?Sized>(&mut self, source: &mut D) -> Result<IndexSummary> {
        self.config.validate()?;
        self.reset_tables()?;

        self.enter(Phase::Ingesting);
        let mut session = IndexingSession::new();
        loop {
            match source.next_document() {
                NextDocument::Ready(doc) => {
                    session.ingest(self.pipeline, &doc);
                    if session.accumulator.pending_docs() >= self.config.flush_threshold {
                        session.flush(self.store)?;
                    }
                }
                NextDocument::Unavailable { doc_id, error } => {
                    warn!(doc_id, error = %error, "skipping unreadable document");
                    session.skipped += 1;
                    session.last_doc_id = session.last_doc_id.max(doc_id);
                }
                NextDocument::Failed(error) => return Err(error),
                NextDocument::EndOfCorpus => break,
            }
        }

        self.enter(Phase::Finalizing);
        let total_docs = session.last_doc_id;
        if total_docs == 0 {
            return Err(IndexError::EmptyCorpus);
        }
        session.flush(self.store)?;
        let dictionary = build_dictionary(self.store, &session.document_frequency, total_docs)?;
        compute_lengths(self.store, &dictionary, &session.ingested)?;
        self.store.sync()?;
        save_meta(self.store, total_docs)?;
        self.store.sync()?;

        self.enter(Phase::Done);
        let summary = IndexSummary {
            total_docs,
            indexed_docs: session.ingested.len(),
            skipped_docs: session.skipped,
            terms: dictionary.len(),
            flushes: session.flushes,
        };
        info!(?summary, "index build complete");
        Ok(summary)
    }

    /// Metadata goes first so an interrupted rerun is never mistaken for a complete index.
    fn reset_tables(&self) -> Result<()> {
        for table in [Table::Metadata, Table::Postings, Table::Dictionary, Table::Lengths] {
            self.store.clear(table)?;
        }
        self.store.sync()
    }
}
