//! Hybrid retrieval with semantic and keyword fan-out.
//!
//! The fuser expands a query into variants, runs per-variant semantic and
//! keyword searches, fuses the ranked lists with Reciprocal Rank Fusion,
//! then diversifies by source, injects and boosts topic summaries, and
//! truncates. Per-query states: Classify -> Expand -> FanOutSearch ->
//! Fuse -> Diversify -> Inject -> Boost -> Truncate -> Return;
//! `FanOutSearch` is the only state that performs blocking I/O.

mod post;
mod rrf;

pub use post::{boost_topic_summaries, diversify_by_source, inject_topic_summaries};
pub use rrf::{RRF_K, RankedList, RrfConfig, reciprocal_rank_fusion};

use crate::core::{Chunk, ChunkKey};
use crate::domain::DomainProfile;
use crate::error::Result;
use crate::keyword::Bm25Index;
use crate::query::{QueryVariant, expand_cross_source, expand_specialized, is_specialized};
use crate::store::{MetadataFilter, VectorStore, merge_filters};
use crate::topic::assign_topics;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::Instant;

/// Upper bound on concurrent vector-store searches within one query.
pub const MAX_CONCURRENT_SEARCHES: usize = 8;

/// Minimum candidates requested per variant.
const MIN_PER_VARIANT: usize = 4;

/// One fully-planned retrieval variant: text plus the effective filter
/// after merging the caller's filter with the variant's own.
#[derive(Debug, Clone)]
struct VariantPlan {
    text: String,
    filter: Option<MetadataFilter>,
    weight: f64,
}

/// Hybrid fuser over one store, one optional keyword index, and one
/// domain profile.
pub struct HybridSearcher {
    store: Arc<dyn VectorStore>,
    keyword: Option<Arc<Bm25Index>>,
    profile: Arc<DomainProfile>,
}

impl HybridSearcher {
    /// Creates a fuser. Pass `keyword: None` to run semantic-only.
    #[must_use]
    pub fn new(
        store: Arc<dyn VectorStore>,
        keyword: Option<Arc<Bm25Index>>,
        profile: Arc<DomainProfile>,
    ) -> Self {
        Self {
            store,
            keyword,
            profile,
        }
    }

    /// Runs the full retrieval flow and returns up to `k_final` chunks.
    ///
    /// Per-variant store failures are logged and downgraded to empty
    /// lists; the query returns as long as at least one list or the
    /// injection yielded results, else it returns `[]`.
    ///
    /// # Errors
    ///
    /// Returns an error only for failures outside the per-variant
    /// degradation policy (none today; kept for facade uniformity).
    pub fn search(
        &self,
        query: &str,
        k: usize,
        filter: Option<&MetadataFilter>,
        deadline: Option<Instant>,
    ) -> Result<Vec<Chunk>> {
        let specialized = is_specialized(query, &self.profile) && self.specialized_path_allowed(filter);

        if !specialized && self.keyword.is_none() {
            return self.plain_semantic(query, k, filter);
        }

        let (plans, k_final, k_per_variant) = if specialized {
            self.plan_specialized(query, k, filter)
        } else {
            self.plan_generic(query, k, filter)
        };

        let semantic_lists = self.fan_out_semantic(&plans, k_per_variant, deadline);
        let keyword_lists = self.run_keyword(&plans, k_per_variant);

        let mut by_key: HashMap<ChunkKey, Chunk> = HashMap::new();
        let mut ranked: Vec<RankedList> = Vec::new();
        for (plan, list) in plans.iter().zip(&semantic_lists) {
            ranked.push(collect_list(plan.weight, list, &mut by_key));
        }
        for (plan, list) in plans.iter().zip(&keyword_lists) {
            ranked.push(collect_list(plan.weight, list, &mut by_key));
        }

        let fused = reciprocal_rank_fusion(&ranked, &RrfConfig::default());
        let mut chunks: Vec<Chunk> = fused
            .into_iter()
            .filter_map(|(key, _)| by_key.remove(&key))
            .collect();

        if filter.and_then(MetadataFilter::pinned_source).is_none() {
            chunks = diversify_by_source(chunks, k_final);
        }

        let topics = assign_topics(query, &self.profile.topics);
        chunks = inject_topic_summaries(self.store.as_ref(), chunks, &topics);
        chunks = boost_topic_summaries(chunks, &topics);

        chunks.truncate(k_final);
        Ok(chunks)
    }

    /// Plain semantic path used when no keyword index is available: one
    /// similarity search, then injection and boost.
    fn plain_semantic(
        &self,
        query: &str,
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<Chunk>> {
        let docs = match self.store.similarity_search(query, k, filter) {
            Ok(docs) => docs,
            Err(e) => {
                tracing::warn!(error = %e, "semantic search failed, returning empty");
                Vec::new()
            }
        };
        let topics = assign_topics(query, &self.profile.topics);
        let mut chunks = inject_topic_summaries(self.store.as_ref(), docs, &topics);
        chunks = boost_topic_summaries(chunks, &topics);
        chunks.truncate(k);
        Ok(chunks)
    }

    /// The specialized path is skipped when the caller already pins a
    /// source different from the profile's specialized pin: the user's
    /// explicit filter wins.
    fn specialized_path_allowed(&self, filter: Option<&MetadataFilter>) -> bool {
        let Some(pin) = self.profile.specialized_source.as_deref() else {
            return true;
        };
        match filter.and_then(MetadataFilter::pinned_source) {
            Some(caller_pin) => caller_pin == pin,
            None => true,
        }
    }

    /// Generic plan: cross-source expansion with the caller's filter
    /// forced onto the baseline variant and merged into the rest.
    fn plan_generic(
        &self,
        query: &str,
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> (Vec<VariantPlan>, usize, usize) {
        let variants = expand_cross_source(query, &self.profile);
        let plans = merge_variant_filters(&variants, filter);
        let k_final = k;
        let n = plans.len().max(1);
        let k_per_variant = (k_final.div_ceil(n) * 2).max(MIN_PER_VARIANT);
        (plans, k_final, k_per_variant)
    }

    /// Specialized plan: expanded variants under the profile's source pin
    /// (merged with the caller's filter), plus one baseline variant under
    /// the caller's filter alone.
    fn plan_specialized(
        &self,
        query: &str,
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> (Vec<VariantPlan>, usize, usize) {
        let pin = self
            .profile
            .specialized_source
            .as_deref()
            .map(|kind| MetadataFilter::equals("source", kind));

        let mut plans: Vec<VariantPlan> = Vec::new();
        for (i, text) in expand_specialized(query, &self.profile).into_iter().enumerate() {
            let variant = QueryVariant {
                text,
                filter: pin.clone(),
                weight: 1.0,
            };
            match merge_filters(filter, variant.filter.as_ref()) {
                Some(effective) => plans.push(VariantPlan {
                    text: variant.text,
                    filter: effective,
                    weight: variant.weight,
                }),
                None => {
                    tracing::debug!(variant = i, "variant filter contradicts caller filter, skipped");
                }
            }
        }

        // Baseline variant under the caller's filter alone, bypassing the pin.
        plans.push(VariantPlan {
            text: query.to_string(),
            filter: filter.cloned(),
            weight: 1.0,
        });

        let k_final = k.max(self.profile.specialized_k_floor);
        let k_per_variant = (k_final / 3).max(MIN_PER_VARIANT);
        (plans, k_final, k_per_variant)
    }

    /// Launches per-variant semantic searches on detached worker threads,
    /// bounded at `min(n_variants, 8)`, and joins them through a channel.
    ///
    /// On deadline expiry the fuser proceeds with whatever lists
    /// completed; stragglers are dropped. A failing variant is logged and
    /// contributes an empty list.
    fn fan_out_semantic(
        &self,
        plans: &[VariantPlan],
        k_per_variant: usize,
        deadline: Option<Instant>,
    ) -> Vec<Vec<Chunk>> {
        let n = plans.len();
        if n == 0 {
            return Vec::new();
        }

        let shared: Arc<Vec<VariantPlan>> = Arc::new(plans.to_vec());
        let next = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = mpsc::channel::<(usize, Vec<Chunk>)>();

        for _ in 0..n.min(MAX_CONCURRENT_SEARCHES) {
            let shared = Arc::clone(&shared);
            let next = Arc::clone(&next);
            let store = Arc::clone(&self.store);
            let tx = tx.clone();
            std::thread::spawn(move || {
                loop {
                    let idx = next.fetch_add(1, AtomicOrdering::SeqCst);
                    let Some(plan) = shared.get(idx) else {
                        break;
                    };
                    if deadline.is_some_and(|d| Instant::now() >= d) {
                        // Past the deadline: don't start new store calls.
                        if tx.send((idx, Vec::new())).is_err() {
                            break;
                        }
                        continue;
                    }
                    let list = match store.similarity_search(&plan.text, k_per_variant, plan.filter.as_ref())
                    {
                        Ok(list) => list,
                        Err(e) => {
                            tracing::warn!(variant = idx, error = %e, "variant search failed");
                            Vec::new()
                        }
                    };
                    if tx.send((idx, list)).is_err() {
                        break;
                    }
                }
            });
        }
        drop(tx);

        let mut results: Vec<Vec<Chunk>> = vec![Vec::new(); n];
        let mut received = 0;
        while received < n {
            let message = match deadline {
                Some(d) => {
                    let now = Instant::now();
                    if now >= d {
                        break;
                    }
                    rx.recv_timeout(d - now)
                }
                None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };
            match message {
                Ok((idx, list)) => {
                    results[idx] = list;
                    received += 1;
                }
                Err(RecvTimeoutError::Timeout) => break,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        if received < n {
            tracing::warn!(
                completed = received,
                total = n,
                "deadline reached, fusing partial results"
            );
        }
        results
    }

    /// Runs per-variant keyword searches on the calling thread (in-memory,
    /// CPU-bound). Returns one (possibly empty) list per plan.
    fn run_keyword(&self, plans: &[VariantPlan], k_per_variant: usize) -> Vec<Vec<Chunk>> {
        let Some(index) = &self.keyword else {
            return vec![Vec::new(); plans.len()];
        };
        plans
            .iter()
            .map(|plan| {
                index
                    .search(&plan.text, k_per_variant, plan.filter.as_ref())
                    .into_iter()
                    .map(|(chunk, _)| chunk)
                    .collect()
            })
            .collect()
    }
}

/// Merges the caller filter onto expansion variants: the baseline (first)
/// variant takes the caller's filter verbatim; later variants merge it
/// with their own source filter as a conjunction. Contradictory merges
/// drop the variant.
fn merge_variant_filters(
    variants: &[QueryVariant],
    caller: Option<&MetadataFilter>,
) -> Vec<VariantPlan> {
    let mut plans = Vec::with_capacity(variants.len());
    for (i, variant) in variants.iter().enumerate() {
        if i == 0 {
            plans.push(VariantPlan {
                text: variant.text.clone(),
                filter: caller.cloned(),
                weight: variant.weight,
            });
            continue;
        }
        match merge_filters(caller, variant.filter.as_ref()) {
            Some(effective) => plans.push(VariantPlan {
                text: variant.text.clone(),
                filter: effective,
                weight: variant.weight,
            }),
            None => {
                tracing::debug!(variant = i, "variant filter contradicts caller filter, skipped");
            }
        }
    }
    plans
}

fn collect_list(
    weight: f64,
    list: &[Chunk],
    by_key: &mut HashMap<ChunkKey, Chunk>,
) -> RankedList {
    let keys: Vec<ChunkKey> = list
        .iter()
        .map(|chunk| {
            let key = chunk.key();
            by_key.entry(key.clone()).or_insert_with(|| chunk.clone());
            key
        })
        .collect();
    RankedList::weighted(keys, weight)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetrievalConfig;
    use crate::domain::medicare;
    use crate::embedding::{DEFAULT_DIMENSIONS, HashEmbedder};
    use crate::store::MemoryVectorStore;

    fn profile() -> Arc<DomainProfile> {
        Arc::new(medicare::profile(&RetrievalConfig::default()).unwrap())
    }

    fn seeded_store() -> Arc<MemoryVectorStore> {
        let store = MemoryVectorStore::new(Arc::new(HashEmbedder::new(DEFAULT_DIMENSIONS)));
        store
            .add_chunks(vec![
                Chunk::new("lcd_hbo", 0, "hyperbaric oxygen therapy covered for diabetic wounds")
                    .with_meta("source", "mcd"),
                Chunk::new("lcd_hbo", 1, "hyperbaric oxygen therapy utilization limits")
                    .with_meta("source", "mcd"),
                Chunk::new("iom_ch1", 0, "general enrollment and eligibility policy")
                    .with_meta("source", "iom"),
                Chunk::new("hcpcs_a", 0, "HCPCS code A1001 surgical dressing")
                    .with_meta("source", "codes"),
                Chunk::new("topic_hyperbaric", 0, "Hyperbaric oxygen therapy coverage overview")
                    .with_meta("doc_type", "topic_summary")
                    .with_meta("topic_cluster", "hyperbaric"),
            ])
            .unwrap();
        Arc::new(store)
    }

    fn searcher(store: Arc<MemoryVectorStore>, with_keyword: bool) -> HybridSearcher {
        let keyword = with_keyword.then(|| {
            Arc::new(Bm25Index::build(store.export_chunks().unwrap()))
        });
        HybridSearcher::new(store, keyword, profile())
    }

    #[test]
    fn test_generic_hybrid_returns_results() {
        let searcher = searcher(seeded_store(), true);
        let results = searcher
            .search("general enrollment policy", 4, None, None)
            .unwrap();
        assert!(!results.is_empty());
        assert!(results.len() <= 4);
        assert!(results.iter().any(|c| c.doc_id == "iom_ch1"));
    }

    #[test]
    fn test_specialized_path_floors_k() {
        let searcher = searcher(seeded_store(), true);
        // Specialized query with small k still searches with the floor;
        // the corpus is small so everything relevant comes back.
        let results = searcher
            .search("Is hyperbaric oxygen therapy covered?", 2, None, None)
            .unwrap();
        assert!(!results.is_empty());
    }

    #[test]
    fn test_specialized_injects_topic_summary() {
        let searcher = searcher(seeded_store(), true);
        let results = searcher
            .search("Is hyperbaric oxygen therapy covered?", 5, None, None)
            .unwrap();
        let top3: Vec<&str> = results.iter().take(3).map(|c| c.doc_id.as_str()).collect();
        assert!(top3.contains(&"topic_hyperbaric"));
    }

    #[test]
    fn test_caller_pin_respected_on_generic_path() {
        let searcher = searcher(seeded_store(), true);
        let filter = MetadataFilter::equals("source", "iom");
        let results = searcher
            .search("enrollment eligibility policy", 4, Some(&filter), None)
            .unwrap();
        assert!(!results.is_empty());
        // No topic matches this query, so nothing is injected and every
        // result obeys the pin.
        assert!(results.iter().all(|c| c.source() == Some("iom")));
    }

    #[test]
    fn test_caller_pin_skips_specialized_path() {
        let searcher = searcher(seeded_store(), true);
        // Specialized query, but the caller pins codes (!= mcd): the
        // specialized pin must not override it.
        let filter = MetadataFilter::equals("source", "codes");
        let results = searcher
            .search("Is hyperbaric oxygen therapy covered?", 4, Some(&filter), None)
            .unwrap();
        for chunk in &results {
            let injected_summary = chunk.doc_type().is_summary();
            assert!(injected_summary || chunk.source() == Some("codes"));
        }
    }

    #[test]
    fn test_plain_semantic_without_keyword_index() {
        let searcher = searcher(seeded_store(), false);
        let results = searcher
            .search("general enrollment policy", 3, None, None)
            .unwrap();
        assert!(!results.is_empty());
        assert!(results.len() <= 3);
    }

    #[test]
    fn test_deterministic_across_runs() {
        let store = seeded_store();
        let searcher = searcher(store, true);
        let a = searcher
            .search("Is hyperbaric oxygen therapy covered?", 5, None, None)
            .unwrap();
        let b = searcher
            .search("Is hyperbaric oxygen therapy covered?", 5, None, None)
            .unwrap();
        let keys_a: Vec<ChunkKey> = a.iter().map(Chunk::key).collect();
        let keys_b: Vec<ChunkKey> = b.iter().map(Chunk::key).collect();
        assert_eq!(keys_a, keys_b);
    }

    #[test]
    fn test_expired_deadline_yields_partial_or_empty() {
        let searcher = searcher(seeded_store(), false);
        let past = Instant::now() - std::time::Duration::from_secs(1);
        // Plain path ignores the deadline; hybrid path with expired
        // deadline must not hang and may return only injected anchors.
        let results = searcher
            .search("Is hyperbaric oxygen therapy covered?", 4, None, Some(past))
            .unwrap();
        for chunk in &results {
            assert!(chunk.doc_type().is_summary());
        }
    }

    #[test]
    fn test_empty_store_returns_empty() {
        let store = Arc::new(MemoryVectorStore::new(Arc::new(HashEmbedder::new(
            DEFAULT_DIMENSIONS,
        ))));
        let searcher = HybridSearcher::new(store, None, profile());
        let results = searcher.search("anything at all", 4, None, None).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_merge_variant_filters_baseline_takes_caller() {
        let variants = vec![
            QueryVariant::plain("q"),
            QueryVariant {
                text: "q mcd terms".to_string(),
                filter: Some(MetadataFilter::equals("source", "mcd")),
                weight: 1.0,
            },
            QueryVariant {
                text: "q iom terms".to_string(),
                filter: Some(MetadataFilter::equals("source", "iom")),
                weight: 1.0,
            },
        ];
        let caller = MetadataFilter::equals("source", "mcd");
        let plans = merge_variant_filters(&variants, Some(&caller));
        // Baseline keeps the caller filter; the iom variant contradicts
        // the caller pin and is dropped.
        assert_eq!(plans.len(), 2);
        assert_eq!(plans[0].filter.as_ref().unwrap().pinned_source(), Some("mcd"));
        assert_eq!(plans[1].filter.as_ref().unwrap().pinned_source(), Some("mcd"));
    }
}
