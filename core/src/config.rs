use crate::error::{IndexError, Result};

/// Number of results returned by a query.
pub const TOP_K: usize = 10;

pub const DEFAULT_FLUSH_THRESHOLD: usize = 500;
pub const DEFAULT_COSINE_WEIGHT: f64 = 0.9;
pub const DEFAULT_AUTHORITY_WEIGHT: f64 = 0.1;

#[derive(Debug, Clone)]
pub struct IndexerConfig {
    /// Documents accumulated in memory before postings are merged into storage.
    pub flush_threshold: usize,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self { flush_threshold: DEFAULT_FLUSH_THRESHOLD }
    }
}

impl IndexerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.flush_threshold == 0 {
            return Err(IndexError::Config("flush threshold must be at least 1".into()));
        }
        Ok(())
    }
}

/// Blend of cosine similarity and authority score. The weights need not sum to 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankingConfig {
    pub cosine_weight: f64,
    pub authority_weight: f64,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self { cosine_weight: DEFAULT_COSINE_WEIGHT, authority_weight: DEFAULT_AUTHORITY_WEIGHT }
    }
}

impl RankingConfig {
    pub fn new(cosine_weight: f64, authority_weight: f64) -> Self {
        Self { cosine_weight, authority_weight }
    }

    pub fn validate(&self) -> Result<()> {
        for (name, w) in [("cosine", self.cosine_weight), ("authority", self.authority_weight)] {
            if !w.is_finite() || w < 0.0 {
                return Err(IndexError::Config(format!("{name} weight must be a finite, non-negative number, got {w}")));
            }
        }
        Ok(())
    }
}
