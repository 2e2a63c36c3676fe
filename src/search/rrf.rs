//! Reciprocal Rank Fusion (RRF).
//!
//! Combines ranked lists from heterogeneous retrievers into a single
//! fused ranking without requiring calibrated scores. Based on: Cormack,
//! Clarke, Buettcher (2009) - "Reciprocal Rank Fusion outperforms
//! Condorcet and individual Rank Learning Methods".

use crate::core::ChunkKey;
use std::cmp::Ordering;
use std::collections::HashMap;

/// The standard RRF constant. Kept in one place.
pub const RRF_K: u32 = 60;

/// Configuration for the RRF algorithm.
#[derive(Debug, Clone, Copy)]
pub struct RrfConfig {
    /// Controls how much weight lower-ranked items receive; higher values
    /// flatten the contribution curve. 60 is the value recommended in the
    /// original paper.
    pub k: u32,
}

impl Default for RrfConfig {
    fn default() -> Self {
        Self { k: RRF_K }
    }
}

impl RrfConfig {
    /// Creates a new RRF config with the specified k value.
    #[must_use]
    pub const fn new(k: u32) -> Self {
        Self { k }
    }
}

/// One ranked result list entering the fusion, most relevant first.
#[derive(Debug, Clone)]
pub struct RankedList {
    /// Deduplication keys in rank order.
    pub keys: Vec<ChunkKey>,
    /// Weight multiplying this list's contributions.
    pub weight: f64,
}

impl RankedList {
    /// Creates a list with weight 1.0.
    #[must_use]
    pub fn new(keys: Vec<ChunkKey>) -> Self {
        Self { keys, weight: 1.0 }
    }

    /// Creates a weighted list.
    #[must_use]
    pub fn weighted(keys: Vec<ChunkKey>, weight: f64) -> Self {
        Self { keys, weight }
    }
}

/// Performs weighted Reciprocal Rank Fusion over multiple ranked lists.
///
/// Each item scores `Σ w_l / (k + rank_l + 1)` over the lists containing
/// it (ranks are 0-indexed). Output is sorted by score descending; ties
/// break by the lower earliest rank across lists, then by lexicographic
/// `(doc_id, chunk_index)`. The result is invariant under reordering of
/// the input lists.
#[must_use]
pub fn reciprocal_rank_fusion(lists: &[RankedList], config: &RrfConfig) -> Vec<(ChunkKey, f64)> {
    struct Acc {
        contributions: Vec<f64>,
        best_rank: usize,
    }

    let mut scores: HashMap<ChunkKey, Acc> = HashMap::new();

    for list in lists {
        for (rank, key) in list.keys.iter().enumerate() {
            let contribution =
                list.weight / f64::from(config.k + u32::try_from(rank).unwrap_or(u32::MAX) + 1);
            scores
                .entry(key.clone())
                .and_modify(|acc| {
                    acc.contributions.push(contribution);
                    acc.best_rank = acc.best_rank.min(rank);
                })
                .or_insert(Acc {
                    contributions: vec![contribution],
                    best_rank: rank,
                });
        }
    }

    // Per-key contributions are summed in sorted order: float addition is
    // not associative, and the fused ranking must not depend on the order
    // the input lists arrived in.
    let mut results: Vec<(ChunkKey, f64, usize)> = scores
        .into_iter()
        .map(|(key, mut acc)| {
            acc.contributions.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
            let score: f64 = acc.contributions.iter().sum();
            (key, score, acc.best_rank)
        })
        .collect();

    results.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.2.cmp(&b.2))
            .then_with(|| a.0.cmp(&b.0))
    });

    results.into_iter().map(|(key, score, _)| (key, score)).collect()
}
