//! Record normalization: rating clamping, language back-fill, and
//! deduplication.
//!
//! Two interchangeable implementations sit behind one capability trait,
//! selected by configuration rather than runtime availability probing, so
//! the pipeline itself stays single-path. Normalization is idempotent:
//! running it over an already-normalized set changes nothing.

use std::collections::HashSet;

use serde::Deserialize;
use tracing::debug;

use crate::lang;
use crate::record::ReviewRecord;

/// Which normalizer implementation to run.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalizeMode {
    /// Sequential, single-threaded pass.
    Baseline,
    /// Chunked across scoped threads; language detection dominates the cost
    /// on large runs.
    Parallel,
}

pub trait Normalizer {
    fn normalize(&self, records: Vec<ReviewRecord>) -> Vec<ReviewRecord>;
}

/// Select an implementation from configuration.
pub fn from_mode(mode: NormalizeMode, chunk_size: usize) -> Box<dyn Normalizer + Send + Sync> {
    match mode {
        NormalizeMode::Baseline => Box::new(BaselineNormalizer),
        NormalizeMode::Parallel => Box::new(ParallelNormalizer {
            chunk_size: chunk_size.max(1),
        }),
    }
}

/// Normalize one record in place.
fn normalize_one(record: &mut ReviewRecord) {
    if let Some(rating) = record.rating {
        record.rating = Some(rating.clamp(1, 5));
    }
    // Only fill a missing language; an existing classification (including
    // "unknown") is never re-detected, which keeps the pass idempotent.
    if record.language.is_empty() {
        record.language = lang::detect_language(&record.text);
    }
}

/// Drop duplicate records, preserving first-seen order.
fn dedup(records: Vec<ReviewRecord>) -> Vec<ReviewRecord> {
    let before = records.len();
    let mut seen = HashSet::new();
    let deduped: Vec<ReviewRecord> = records
        .into_iter()
        .filter(|r| seen.insert(r.dedup_key()))
        .collect();
    if deduped.len() < before {
        debug!("Deduplication removed {} records", before - deduped.len());
    }
    deduped
}

pub struct BaselineNormalizer;

impl Normalizer for BaselineNormalizer {
    fn normalize(&self, mut records: Vec<ReviewRecord>) -> Vec<ReviewRecord> {
        for record in &mut records {
            normalize_one(record);
        }
        dedup(records)
    }
}

pub struct ParallelNormalizer {
    pub chunk_size: usize,
}

impl Normalizer for ParallelNormalizer {
    fn normalize(&self, mut records: Vec<ReviewRecord>) -> Vec<ReviewRecord> {
        std::thread::scope(|scope| {
            for chunk in records.chunks_mut(self.chunk_size) {
                scope.spawn(move || {
                    for record in chunk {
                        normalize_one(record);
                    }
                });
            }
        });
        dedup(records)
    }
}
