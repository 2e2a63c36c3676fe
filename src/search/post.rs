//! Post-fusion result shaping.
//!
//! Source diversification, topic-summary injection, and topic-summary
//! boosting. Summary documents act as stable anchors: they consolidate
//! fragmented content and match consistently regardless of phrasing, so
//! the fuser looks them up by deterministic ID and floats them to the top
//! rather than hoping they rank by similarity.

use crate::core::Chunk;
use crate::store::VectorStore;
use crate::topic::topic_summary_ids;
use std::collections::HashMap;
use std::collections::HashSet;

/// Interleaves results by `source` so no single source occupies more than
/// `ceil(k / 2)` of the top-`k` slots.
///
/// Stable: relative order within each source is preserved; chunks pushed
/// out of the cap are appended after the diversified head, still in
/// order. Chunks without a `source` count as their own bucket.
#[must_use]
pub fn diversify_by_source(chunks: Vec<Chunk>, k: usize) -> Vec<Chunk> {
    if k == 0 || chunks.len() <= 1 {
        return chunks;
    }
    let cap = k.div_ceil(2);
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut head: Vec<Chunk> = Vec::with_capacity(chunks.len());
    let mut overflow: Vec<Chunk> = Vec::new();

    for chunk in chunks {
        let source = chunk.source().unwrap_or("").to_string();
        let count = counts.entry(source).or_insert(0);
        if head.len() < k && *count < cap {
            *count += 1;
            head.push(chunk);
        } else {
            overflow.push(chunk);
        }
    }

    head.extend(overflow);
    head
}

/// Prepends topic-summary chunks for the detected query topics when they
/// are not already present by `doc_id`.
///
/// Summaries are looked up via `get_by_ids`; absent IDs are a normal case.
/// A failing lookup is logged and injection is skipped so the query still
/// returns.
#[must_use]
pub fn inject_topic_summaries(
    store: &dyn VectorStore,
    chunks: Vec<Chunk>,
    topics: &[String],
) -> Vec<Chunk> {
    if topics.is_empty() {
        return chunks;
    }

    let ids = topic_summary_ids(topics);
    let summaries = match store.get_by_ids(&ids) {
        Ok(summaries) => summaries,
        Err(e) => {
            tracing::warn!(error = %e, "topic summary lookup failed, skipping injection");
            return chunks;
        }
    };

    let existing: HashSet<&str> = chunks.iter().map(|c| c.doc_id.as_str()).collect();
    let injected: Vec<Chunk> = summaries
        .into_iter()
        .filter(|s| !existing.contains(s.doc_id.as_str()))
        .collect();

    if injected.is_empty() {
        return chunks;
    }
    tracing::debug!(
        count = injected.len(),
        topics = topics.join(","),
        "injected topic summaries"
    );
    let mut combined = injected;
    combined.extend(chunks);
    combined
}

/// Stable-partitions `chunks` so summaries whose topic intersects the
/// query topics come first, everything else after, order preserved within
/// each part.
#[must_use]
pub fn boost_topic_summaries(chunks: Vec<Chunk>, topics: &[String]) -> Vec<Chunk> {
    if topics.is_empty() {
        return chunks;
    }
    let (boosted, rest): (Vec<Chunk>, Vec<Chunk>) =
        chunks.into_iter().partition(|c| c.is_summary_for(topics));
    let mut combined = boosted;
    combined.extend(rest);
    combined
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::{DEFAULT_DIMENSIONS, HashEmbedder};
    use crate::store::MemoryVectorStore;
    use std::sync::Arc;

    fn chunk(doc: &str, source: &str) -> Chunk {
        Chunk::new(doc, 0, doc).with_meta("source", source)
    }

    #[test]
    fn test_diversify_caps_dominant_source() {
        let chunks = vec![
            chunk("a1", "iom"),
            chunk("a2", "iom"),
            chunk("a3", "iom"),
            chunk("a4", "iom"),
            chunk("b1", "mcd"),
            chunk("b2", "mcd"),
        ];
        let out = diversify_by_source(chunks, 4);
        // cap = 2: top-4 is a1, a2, b1, b2; overflow a3, a4 appended
        let ids: Vec<&str> = out.iter().map(|c| c.doc_id.as_str()).collect();
        assert_eq!(ids, vec!["a1", "a2", "b1", "b2", "a3", "a4"]);
    }

    #[test]
    fn test_diversify_preserves_within_source_order() {
        let chunks = vec![
            chunk("a1", "iom"),
            chunk("b1", "mcd"),
            chunk("a2", "iom"),
            chunk("b2", "mcd"),
            chunk("a3", "iom"),
        ];
        let out = diversify_by_source(chunks.clone(), 4);
        for source in ["iom", "mcd"] {
            let before: Vec<&str> = chunks
                .iter()
                .filter(|c| c.source() == Some(source))
                .map(|c| c.doc_id.as_str())
                .collect();
            let after: Vec<&str> = out
                .iter()
                .filter(|c| c.source() == Some(source))
                .map(|c| c.doc_id.as_str())
                .collect();
            assert_eq!(before, after, "order changed for {source}");
        }
    }

    #[test]
    fn test_diversify_noop_when_balanced() {
        let chunks = vec![chunk("a1", "iom"), chunk("b1", "mcd"), chunk("c1", "codes")];
        let out = diversify_by_source(chunks.clone(), 3);
        assert_eq!(out, chunks);
    }

    #[test]
    fn test_diversify_missing_source_is_own_bucket() {
        let chunks = vec![
            Chunk::new("x1", 0, "x1"),
            Chunk::new("x2", 0, "x2"),
            chunk("a1", "iom"),
        ];
        let out = diversify_by_source(chunks, 2);
        let ids: Vec<&str> = out.iter().map(|c| c.doc_id.as_str()).collect();
        assert_eq!(ids, vec!["x1", "a1", "x2"]);
    }

    fn summary_store() -> MemoryVectorStore {
        let store = MemoryVectorStore::new(Arc::new(HashEmbedder::new(DEFAULT_DIMENSIONS)));
        store
            .add_chunks(vec![
                Chunk::new("topic_wound_care", 0, "Wound care coverage overview")
                    .with_meta("doc_type", "topic_summary")
                    .with_meta("topic_cluster", "wound_care"),
                Chunk::new("topic_imaging", 0, "Imaging coverage overview")
                    .with_meta("doc_type", "topic_summary")
                    .with_meta("topic_cluster", "imaging"),
            ])
            .unwrap();
        store
    }

    #[test]
    fn test_inject_prepends_missing_summary() {
        let store = summary_store();
        let docs = vec![chunk("d1", "mcd")];
        let topics = vec!["wound_care".to_string()];
        let out = inject_topic_summaries(&store, docs, &topics);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].doc_id, "topic_wound_care");
        assert_eq!(out[1].doc_id, "d1");
    }

    #[test]
    fn test_inject_skips_present_and_absent() {
        let store = summary_store();
        let docs = vec![
            Chunk::new("topic_wound_care", 0, "already here")
                .with_meta("doc_type", "topic_summary")
                .with_meta("topic_cluster", "wound_care"),
        ];
        // wound_care already present; no summary exists for "nonexistent"
        let topics = vec!["wound_care".to_string(), "nonexistent".to_string()];
        let out = inject_topic_summaries(&store, docs, &topics);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_inject_no_topics_unchanged() {
        let store = summary_store();
        let docs = vec![chunk("d1", "mcd")];
        let out = inject_topic_summaries(&store, docs.clone(), &[]);
        assert_eq!(out, docs);
    }

    #[test]
    fn test_boost_stable_partition() {
        let topics = vec!["wound_care".to_string()];
        let summary = Chunk::new("topic_wound_care", 0, "summary")
            .with_meta("doc_type", "topic_summary")
            .with_meta("topic_cluster", "wound_care");
        let other_summary = Chunk::new("topic_imaging", 0, "summary")
            .with_meta("doc_type", "topic_summary")
            .with_meta("topic_cluster", "imaging");
        let plain = chunk("d1", "mcd");

        let out = boost_topic_summaries(
            vec![plain.clone(), other_summary.clone(), summary.clone()],
            &topics,
        );
        let ids: Vec<&str> = out.iter().map(|c| c.doc_id.as_str()).collect();
        assert_eq!(ids, vec!["topic_wound_care", "d1", "topic_imaging"]);
    }

    #[test]
    fn test_boost_no_topics_unchanged() {
        let docs = vec![chunk("d1", "mcd"), chunk("d2", "iom")];
        assert_eq!(boost_topic_summaries(docs.clone(), &[]), docs);
    }
}
