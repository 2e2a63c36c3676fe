//! Topic engine.
//!
//! Topics group fragmented content by clinical/policy theme so that
//! related chunks scattered across source documents can be anchored by
//! topic-level summaries. A chunk may belong to multiple topics. Topic
//! definitions are loaded from a domain-supplied JSON pack; summaries are
//! addressable by the deterministic ID `topic_<name>`.

use crate::core::Chunk;
use crate::error::TopicError;
use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Immutable definition of a topic cluster.
#[derive(Debug, Clone)]
pub struct TopicDef {
    /// Short identifier, e.g. `wound_care`.
    pub name: String,
    /// Human-readable label.
    pub label: String,
    /// Case-insensitive patterns; a text matches the topic iff at least
    /// `min_pattern_matches` distinct patterns match.
    pub patterns: Vec<Regex>,
    /// Optional prefix prepended when synthesizing the topic summary.
    pub summary_prefix: String,
    /// Minimum distinct pattern matches, at least 1.
    pub min_pattern_matches: usize,
}

#[derive(Deserialize)]
struct RawTopicDef {
    name: String,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    patterns: Vec<String>,
    #[serde(default)]
    summary_prefix: String,
    #[serde(default)]
    min_pattern_matches: Option<usize>,
}

/// Parses a topic pack from its JSON text.
///
/// # Errors
///
/// Returns `TopicError::Malformed` for invalid JSON or an empty `name`,
/// and `TopicError::Pattern` when a pattern does not compile.
pub fn parse_topic_pack(json: &str) -> Result<Vec<TopicDef>, TopicError> {
    let raw: Vec<RawTopicDef> = serde_json::from_str(json)?;
    raw.into_iter()
        .map(|item| {
            if item.name.is_empty() {
                return Err(TopicError::Malformed {
                    reason: "topic with empty name".to_string(),
                });
            }
            let patterns = item
                .patterns
                .iter()
                .map(|p| {
                    RegexBuilder::new(p).case_insensitive(true).build().map_err(|e| {
                        TopicError::Pattern {
                            topic: item.name.clone(),
                            reason: e.to_string(),
                        }
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(TopicDef {
                label: item.label.unwrap_or_else(|| item.name.clone()),
                min_pattern_matches: item.min_pattern_matches.unwrap_or(1).max(1),
                summary_prefix: item.summary_prefix,
                patterns,
                name: item.name,
            })
        })
        .collect()
}

/// Loads a domain's topic pack, preferring `<dir>/<domain>_topics.json`
/// from the override directory when one is configured and present.
///
/// A missing override file falls back to the embedded pack with a log
/// line; a malformed pack (either source) is fatal.
///
/// # Errors
///
/// Returns `TopicError` when the selected pack does not parse.
pub fn resolve_topic_pack(
    domain: &str,
    override_dir: Option<&Path>,
    embedded_json: &str,
) -> Result<Vec<TopicDef>, TopicError> {
    if let Some(dir) = override_dir {
        let path = dir.join(format!("{domain}_topics.json"));
        match std::fs::read_to_string(&path) {
            Ok(raw) => {
                tracing::info!(domain, path = %path.display(), "loading topic pack override");
                return parse_topic_pack(&raw);
            }
            Err(e) => {
                tracing::debug!(
                    domain,
                    path = %path.display(),
                    error = %e,
                    "topic pack override not readable, using embedded pack"
                );
            }
        }
    }
    parse_topic_pack(embedded_json)
}

/// Returns the names of all topics whose patterns match `text`, in
/// declaration order. A topic matches when at least `min_pattern_matches`
/// distinct patterns match.
#[must_use]
pub fn assign_topics(text: &str, defs: &[TopicDef]) -> Vec<String> {
    defs.iter()
        .filter(|def| {
            let matches = def.patterns.iter().filter(|p| p.is_match(text)).count();
            matches >= def.min_pattern_matches
        })
        .map(|def| def.name.clone())
        .collect()
}

/// Groups chunks by topic cluster. Chunks may appear in multiple
/// clusters; topics with no members are absent from the map.
#[must_use]
pub fn cluster_chunks(chunks: &[Chunk], defs: &[TopicDef]) -> BTreeMap<String, Vec<Chunk>> {
    let mut clusters: BTreeMap<String, Vec<Chunk>> = BTreeMap::new();
    for chunk in chunks {
        for topic in assign_topics(&chunk.content, defs) {
            clusters.entry(topic).or_default().push(chunk.clone());
        }
    }
    clusters
}

/// Returns a copy of `chunk` with `topic_clusters` set to the comma-join
/// of its assigned topics, or the chunk unchanged when no topic applies.
#[must_use]
pub fn tag_with_topics(chunk: &Chunk, defs: &[TopicDef]) -> Chunk {
    let topics = assign_topics(&chunk.content, defs);
    if topics.is_empty() {
        return chunk.clone();
    }
    chunk.clone().with_meta("topic_clusters", topics.join(","))
}

/// The deterministic summary document ID for a topic.
#[must_use]
pub fn topic_summary_id(topic: &str) -> String {
    format!("topic_{topic}")
}

/// The deterministic summary document IDs for a topic list.
#[must_use]
pub fn topic_summary_ids(topics: &[String]) -> Vec<String> {
    topics.iter().map(|t| topic_summary_id(t)).collect()
}
