use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::debug;

use crate::collection::DocumentStore;
use crate::config::{RankingConfig, TOP_K};
use crate::error::{IndexError, Result};
use crate::index::tf_weight;
use crate::persist::{load_dictionary, load_length, load_meta, load_posting_list};
use crate::store::KvStore;
use crate::tokenizer::TextPipeline;
use crate::{DocId, PostingList};

#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub doc_id: DocId,
    pub url: String,
    pub score: f64,
    pub cosine: f64,
    pub authority: f64,
}

/// Query term -> weight, plus the vector's Euclidean norm.
#[derive(Debug, Clone, Default)]
pub struct QueryVector {
    pub weights: HashMap<String, f64>,
    pub length: f64,
}

/// Read-only ranking over a completed index. Safe to share between threads.
pub struct QueryEngine<I, D> {
    index: I,
    documents: D,
    pipeline: TextPipeline,
    ranking: RankingConfig,
    dictionary: HashMap<String, f64>,
    total_docs: u32,
}

impl<I: KvStore, D: DocumentStore> QueryEngine<I, D> {
    /// Fails with [`IndexError::Incomplete`] unless an indexing run reached `Done`.
    pub fn open(index: I, documents: D, pipeline: TextPipeline, ranking: RankingConfig) -> Result<Self> {
        ranking.validate()?;
        let meta = load_meta(&index)?.ok_or(IndexError::Incomplete)?;
        let dictionary = load_dictionary(&index)?;
        debug!(total_docs = meta.total_docs, terms = dictionary.len(), "query engine ready");
        Ok(Self { index, documents, pipeline, ranking, dictionary, total_docs: meta.total_docs })
    }

    pub fn total_docs(&self) -> u32 {
        self.total_docs
    }

    pub fn dictionary_len(&self) -> usize {
        self.dictionary.len()
    }

    pub fn ranking(&self) -> RankingConfig {
        self.ranking
    }

    /// Tokenize `query` exactly like a document body and weight it by TF-IDF.
    /// Terms missing from the dictionary get weight 0.
    pub fn query_vector(&self, query: &str) -> QueryVector {
        let weights: HashMap<String, f64> = self
            .pipeline
            .term_frequencies(query)
            .into_iter()
            .map(|(term, tf)| {
                let idf = self.dictionary.get(&term).copied().unwrap_or(0.0);
                (term, tf_weight(tf) * idf)
            })
            .collect();
        let length = weights.values().map(|w| w * w).sum::<f64>().sqrt();
        QueryVector { weights, length }
    }

    pub fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        self.search_with(query, self.ranking)
    }

    /// Rank `query` with explicit weights. Fails with [`IndexError::Config`] on
    /// negative or non-finite weights.
    pub fn search_with(&self, query: &str, ranking: RankingConfig) -> Result<Vec<SearchHit>> {
        ranking.validate()?;
        let qv = self.query_vector(query);

        // Rarest terms first; only terms in the dictionary can have postings.
        let mut terms: Vec<(&str, f64)> = qv
            .weights
            .keys()
            .filter_map(|t| self.dictionary.get(t).map(|idf| (t.as_str(), *idf)))
            .collect();
        terms.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal).then_with(|| a.0.cmp(b.0)));

        let mut postings: Vec<(&str, PostingList)> = Vec::with_capacity(terms.len());
        for (term, _) in &terms {
            if let Some(list) = load_posting_list(&self.index, term)? {
                postings.push((*term, list));
            }
        }

        let mut scored: HashMap<DocId, (f64, f64, f64)> = HashMap::new();
        for (_, list) in &postings {
            for &doc_id in list.keys() {
                if scored.contains_key(&doc_id) {
                    continue;
                }
                let cosine = self.cosine(doc_id, &qv, &postings)?;
                let authority = self.documents.authority_score(doc_id)?;
                let score = cosine * ranking.cosine_weight + authority * ranking.authority_weight;
                scored.insert(doc_id, (score, cosine, authority));
            }
        }

        let mut ranked: Vec<(DocId, (f64, f64, f64))> = scored.into_iter().collect();
        ranked.sort_by(|a, b| {
            b.1 .0
                .partial_cmp(&a.1 .0)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        ranked.truncate(TOP_K);

        let mut hits = Vec::with_capacity(ranked.len());
        for (doc_id, (score, cosine, authority)) in ranked {
            let doc = self.documents.get_document(doc_id)?.ok_or(IndexError::DocumentNotFound(doc_id))?;
            hits.push(SearchHit { doc_id, url: doc.url, score, cosine, authority });
        }
        debug!(query, candidates = hits.len(), "query served");
        Ok(hits)
    }

    /// Cosine similarity between the query and one candidate; 0 when either norm is 0.
    fn cosine(&self, doc_id: DocId, qv: &QueryVector, postings: &[(&str, PostingList)]) -> Result<f64> {
        let mut dot = 0.0;
        for (term, list) in postings {
            let frequency = list.get(&doc_id).copied().unwrap_or(0);
            let idf = self.dictionary.get(*term).copied().unwrap_or(0.0);
            let query_weight = qv.weights.get(*term).copied().unwrap_or(0.0);
            dot += tf_weight(frequency) * idf * query_weight;
        }
        let doc_length = load_length(&self.index, doc_id)?.ok_or(IndexError::MissingLength(doc_id))?;
        if doc_length == 0.0 || qv.length == 0.0 {
            return Ok(0.0);
        }
        Ok(dot / (doc_length * qv.length))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::{Collection, SequentialScan};
    use crate::config::IndexerConfig;
    use crate::indexer::Indexer;
    use crate::store::MemoryStore;
    use crate::Document;
    use std::sync::Arc;

    fn engine(bodies: &[&str]) -> QueryEngine<Arc<MemoryStore>, Collection<MemoryStore>> {
        let docs = Collection::new(MemoryStore::new());
        for (i, body) in bodies.iter().enumerate() {
            let doc_id = i as DocId + 1;
            docs.insert(&Document {
                doc_id,
                url: format!("https://example.com/{doc_id}"),
                title: String::new(),
                body: body.to_string(),
                authority: 0.0,
            })
            .unwrap();
        }
        let index = Arc::new(MemoryStore::new());
        let pipeline = TextPipeline::new();
        Indexer::new(index.as_ref(), &pipeline, IndexerConfig::default())
            .run(&mut SequentialScan::new(&docs))
            .unwrap();
        QueryEngine::open(index, docs, pipeline, RankingConfig::new(1.0, 0.0)).unwrap()
    }

    #[test]
    fn unknown_terms_have_zero_weight() {
        let e = engine(&["cats love fish", "dogs love fish"]);
        let qv = e.query_vector("zebra cats");
        assert_eq!(qv.weights["zebra"], 0.0);
        assert!(qv.weights["cat"] > 0.0);
        assert!(e.search("zebra").unwrap().is_empty());
    }

    #[test]
    fn empty_query_returns_nothing() {
        let e = engine(&["cats love fish"]);
        assert!(e.search("").unwrap().is_empty());
        assert!(e.search("the and of").unwrap().is_empty());
    }

    #[test]
    fn term_in_every_document_scores_zero_without_dividing_by_zero() {
        let e = engine(&["fish", "fish fish"]);
        let hits = e.search("fish").unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|h| h.cosine == 0.0));
        // equal scores fall back to doc id order
        assert_eq!(hits[0].doc_id, 1);
    }

    #[test]
    fn identical_vectors_have_unit_similarity() {
        let e = engine(&["cats love fish", "dogs bark"]);
        let hits = e.search("fish cats love").unwrap();
        assert_eq!(hits.len(), 1);
        assert!((hits[0].cosine - 1.0).abs() < 1e-9);
        assert_eq!(hits[0].url, "https://example.com/1");
    }

    #[test]
    fn rejects_non_finite_weights() {
        let e = engine(&["cats love fish", "dogs love fish"]);
        for ranking in [
            RankingConfig::new(1.0, f64::INFINITY),
            RankingConfig::new(f64::NAN, 0.1),
            RankingConfig::new(-1.0, 0.1),
        ] {
            assert!(matches!(e.search_with("cats", ranking), Err(IndexError::Config(_))));
        }
        assert_eq!(e.search_with("cats", RankingConfig::new(0.5, 0.5)).unwrap().len(), 1);
    }

    #[test]
    fn refuses_incomplete_index() {
        let result = QueryEngine::open(
            MemoryStore::new(),
            Collection::new(MemoryStore::new()),
            TextPipeline::new(),
            RankingConfig::default(),
        );
        assert!(matches!(result, Err(IndexError::Incomplete)));
    }
}
