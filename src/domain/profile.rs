//! Domain profile record.
//!
//! A profile is a static record of data and compiled patterns; domains are
//! rows in the registry table, not discovered classes. Everything a
//! retrieval call needs to adapt to a corpus lives here.

use crate::error::DomainError;
use crate::topic::TopicDef;
use regex::{Regex, RegexBuilder};
use std::collections::BTreeMap;

/// Per-source-kind chunk sizing override, passed through to the external
/// chunker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkOverride {
    /// Chunk size in characters.
    pub chunk_size: usize,
    /// Overlap between chunks in characters.
    pub chunk_overlap: usize,
}

/// Immutable description of one retrieval domain.
///
/// Collection names are globally unique across profiles; the registry
/// enforces this at registration time.
#[derive(Debug, Clone)]
pub struct DomainProfile {
    /// Short identifier, e.g. `medicare`, `auto`.
    pub name: String,
    /// Human-readable label.
    pub display_name: String,
    /// Vector-store collection name, unique per profile.
    pub collection_name: String,
    /// Valid source-kind identifiers for this domain.
    pub source_kinds: Vec<String>,
    /// Patterns that mark a query as specialized (e.g. LCD queries).
    pub specialized_query_patterns: Vec<Regex>,
    /// `(pattern, expansion)` pairs for topic-directed specialized expansion.
    pub specialized_topic_patterns: Vec<(Regex, String)>,
    /// Fallback expansion when no specialized topic pattern matches.
    pub generic_specialized_expansion: String,
    /// Domain jargon stripped when reducing a query to its concept.
    pub strip_noise_pattern: Option<Regex>,
    /// Filler words stripped when reducing a query to its concept.
    pub strip_filler_pattern: Option<Regex>,
    /// Source-kind detection patterns, in declaration order.
    pub source_patterns: Vec<(String, Vec<Regex>)>,
    /// Source-kind -> expansion suffix for cross-source variants.
    pub source_expansions: BTreeMap<String, String>,
    /// `(pattern, expansion)` pairs appended by synonym expansion.
    pub synonym_map: Vec<(Regex, String)>,
    /// Fallback source relevance when no source signal is detected.
    pub default_source_relevance: BTreeMap<String, f64>,
    /// System prompt handed to the downstream answer generator.
    pub system_prompt: String,
    /// Topic cluster definitions.
    pub topics: Vec<TopicDef>,
    /// Source kind the specialized path pins (e.g. `mcd`), if any.
    pub specialized_source: Option<String>,
    /// Floor for `k_final` on the specialized path.
    pub specialized_k_floor: usize,
    /// Per-source-kind chunk sizing overrides.
    pub chunk_overrides: BTreeMap<String, ChunkOverride>,
    /// US state codes this domain partitions by; empty for federal domains.
    pub states: Vec<String>,
    /// Example questions surfaced by the search UI.
    pub quick_questions: Vec<String>,
}

/// Compiles a list of case-insensitive patterns for `domain`.
///
/// # Errors
///
/// Returns `DomainError::Pattern` when a pattern does not compile.
pub(crate) fn compile_patterns(
    domain: &str,
    patterns: &[&str],
) -> Result<Vec<Regex>, DomainError> {
    patterns
        .iter()
        .map(|p| compile_pattern(domain, p))
        .collect()
}

/// Compiles one case-insensitive pattern for `domain`.
///
/// # Errors
///
/// Returns `DomainError::Pattern` when the pattern does not compile.
pub(crate) fn compile_pattern(domain: &str, pattern: &str) -> Result<Regex, DomainError> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| DomainError::Pattern {
            domain: domain.to_string(),
            reason: e.to_string(),
        })
}

/// Compiles `(pattern, expansion)` pairs for `domain`.
///
/// # Errors
///
/// Returns `DomainError::Pattern` when a pattern does not compile.
pub(crate) fn compile_expansion_pairs(
    domain: &str,
    pairs: &[(&str, &str)],
) -> Result<Vec<(Regex, String)>, DomainError> {
    pairs
        .iter()
        .map(|(p, exp)| Ok((compile_pattern(domain, p)?, (*exp).to_string())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_patterns_case_insensitive() {
        let patterns = compile_patterns("test", &[r"\blcd\b"]).unwrap();
        assert!(patterns[0].is_match("what does the LCD say"));
        assert!(patterns[0].is_match("lcd details"));
        assert!(!patterns[0].is_match("lcds"));
    }

    #[test]
    fn test_compile_patterns_invalid() {
        let err = compile_patterns("test", &["["]).unwrap_err();
        assert!(matches!(err, DomainError::Pattern { domain, .. } if domain == "test"));
    }

    #[test]
    fn test_compile_expansion_pairs() {
        let pairs =
            compile_expansion_pairs("test", &[(r"\bpip\b", "personal injury protection")]).unwrap();
        assert_eq!(pairs.len(), 1);
        assert!(pairs[0].0.is_match("PIP claim"));
        assert_eq!(pairs[0].1, "personal injury protection");
    }
}
