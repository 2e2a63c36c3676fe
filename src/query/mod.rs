//! Query analysis.
//!
//! Pure functions over `(query, profile)`: specialized-query detection,
//! query expansion, source-relevance scoring, and synonym expansion. The
//! original query is always the first variant of any expansion, and query
//! text is only ever augmented, never edited.

use crate::domain::DomainProfile;
use crate::store::MetadataFilter;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// One retrieval variant of a user query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryVariant {
    /// Variant text handed to the retrievers.
    pub text: String,
    /// Source filter this variant carries, if any.
    pub filter: Option<MetadataFilter>,
    /// Fusion weight; the baseline variant is always 1.0.
    pub weight: f64,
}

impl QueryVariant {
    /// Creates an unfiltered variant with weight 1.0.
    #[must_use]
    pub fn plain(text: &str) -> Self {
        Self {
            text: text.to_string(),
            filter: None,
            weight: 1.0,
        }
    }
}

/// True iff any of the profile's specialized query patterns matches.
#[must_use]
pub fn is_specialized(query: &str, profile: &DomainProfile) -> bool {
    profile
        .specialized_query_patterns
        .iter()
        .any(|p| p.is_match(query))
}

/// Expands a specialized query into at most three variants.
///
/// 1. The original query, verbatim.
/// 2. The query plus the expansions of every matching specialized topic
///    pattern, or the profile's generic expansion when none match.
/// 3. A concept-only reduction, emitted only when it is non-empty and
///    differs case-insensitively from the original.
#[must_use]
pub fn expand_specialized(query: &str, profile: &DomainProfile) -> Vec<String> {
    let mut variants = vec![query.to_string()];

    let topic_expansions: Vec<&str> = profile
        .specialized_topic_patterns
        .iter()
        .filter(|(pattern, _)| pattern.is_match(query))
        .map(|(_, expansion)| expansion.as_str())
        .collect();

    if topic_expansions.is_empty() {
        variants.push(format!("{query} {}", profile.generic_specialized_expansion));
    } else {
        variants.push(format!("{query} {}", topic_expansions.join(" ")));
    }

    let concept = strip_to_concept(query, profile);
    if !concept.is_empty() && !concept.eq_ignore_ascii_case(query) {
        variants.push(concept);
    }

    variants
}

static PAREN_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[()]+").expect("static pattern"));
static SPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s{2,}").expect("static pattern"));

/// Removes domain jargon and filler words to isolate the core concept.
///
/// Applies the profile's strip-noise pattern, then strip-filler, then
/// collapses parentheses to spaces and whitespace runs to single spaces,
/// and trims trailing `? . , ; :`.
#[must_use]
pub fn strip_to_concept(query: &str, profile: &DomainProfile) -> String {
    let mut cleaned = query.to_string();
    if let Some(noise) = &profile.strip_noise_pattern {
        cleaned = noise.replace_all(&cleaned, "").into_owned();
    }
    if let Some(filler) = &profile.strip_filler_pattern {
        cleaned = filler.replace_all(&cleaned, "").into_owned();
    }
    cleaned = PAREN_RUN.replace_all(&cleaned, " ").into_owned();
    cleaned = SPACE_RUN.replace_all(&cleaned, " ").into_owned();
    cleaned.trim_matches([' ', '?', '.', ',', ';', ':']).to_string()
}

/// Scores each source kind's relevance to the query on a 0.0-1.0 scale.
///
/// For each kind, `M` distinct matching patterns against a threshold of
/// `max(1, n_patterns / 3)` gives `min(1, M / T)`. When every score is
/// zero, the profile's default relevance is returned verbatim so
/// cross-source retrieval still casts a wide net.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn detect_source_relevance(query: &str, profile: &DomainProfile) -> BTreeMap<String, f64> {
    let mut scores = BTreeMap::new();
    for (kind, patterns) in &profile.source_patterns {
        let threshold = (patterns.len() / 3).max(1);
        let matches = patterns.iter().filter(|p| p.is_match(query)).count();
        let score = (matches as f64 / threshold as f64).min(1.0);
        scores.insert(kind.clone(), score);
    }

    if scores.values().all(|&v| v == 0.0) {
        return profile.default_source_relevance.clone();
    }
    scores
}

/// Appends the expansion of every matching synonym entry, in declaration
/// order. Returns the query unchanged when nothing matches.
#[must_use]
pub fn apply_synonyms(query: &str, profile: &DomainProfile) -> String {
    let additions: Vec<&str> = profile
        .synonym_map
        .iter()
        .filter(|(pattern, _)| pattern.is_match(query))
        .map(|(_, expansion)| expansion.as_str())
        .collect();
    if additions.is_empty() {
        return query.to_string();
    }
    format!("{query} {}", additions.join(" "))
}

/// Expands a query into cross-source variants.
///
/// The first entry is always the original query with no filter; then one
/// source-filtered variant per relevant source kind with an expansion, in
/// the profile's source declaration order; finally the synonym-expanded
/// variant when synonyms changed the query.
#[must_use]
pub fn expand_cross_source(query: &str, profile: &DomainProfile) -> Vec<QueryVariant> {
    let mut variants = vec![QueryVariant::plain(query)];

    let relevance = detect_source_relevance(query, profile);
    for (kind, _) in &profile.source_patterns {
        let score = relevance.get(kind).copied().unwrap_or(0.0);
        if score > 0.0
            && let Some(expansion) = profile.source_expansions.get(kind)
        {
            variants.push(QueryVariant {
                text: format!("{query} {expansion}"),
                filter: Some(MetadataFilter::equals("source", kind.as_str())),
                weight: 1.0,
            });
        }
    }

    let synonym_expanded = apply_synonyms(query, profile);
    if synonym_expanded != query {
        variants.push(QueryVariant::plain(&synonym_expanded));
    }

    variants
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetrievalConfig;
    use crate::domain::{auto, medicare};
    use test_case::test_case;

    fn medicare_profile() -> DomainProfile {
        medicare::profile(&RetrievalConfig::default()).unwrap()
    }

    fn auto_profile() -> DomainProfile {
        auto::profile(&RetrievalConfig::default()).unwrap()
    }

    #[test_case("Is hyperbaric oxygen therapy covered?", true; "hyperbaric coverage")]
    #[test_case("What does the LCD for wound care say?", true; "lcd")]
    #[test_case("coverage determination for imaging", true; "coverage determination")]
    #[test_case("What is Medicare timely filing?", false; "plain iom question")]
    fn test_is_specialized_medicare(query: &str, expected: bool) {
        assert_eq!(is_specialized(query, &medicare_profile()), expected);
    }

    #[test]
    fn test_expand_specialized_first_is_original() {
        let profile = medicare_profile();
        let query = "Is hyperbaric oxygen therapy covered?";
        let variants = expand_specialized(query, &profile);
        assert_eq!(variants[0], query);
        assert!(variants.len() <= 3);
    }

    #[test]
    fn test_expand_specialized_topic_expansion() {
        let profile = medicare_profile();
        let variants = expand_specialized("Is hyperbaric oxygen therapy covered?", &profile);
        assert!(variants[1].contains("hyperbaric oxygen therapy wound healing"));
    }

    #[test]
    fn test_expand_specialized_generic_fallback() {
        let profile = medicare_profile();
        let variants = expand_specialized("Does jurisdiction JH cover acupuncture?", &profile);
        assert!(variants[1].contains("Local Coverage Determination LCD policy coverage criteria"));
    }

    #[test]
    fn test_expand_specialized_concept_variant() {
        let profile = medicare_profile();
        let variants = expand_specialized("Does the LCD cover hyperbaric oxygen?", &profile);
        let concept = variants.last().unwrap();
        // Jargon and filler removed, concept kept
        assert!(concept.to_lowercase().contains("hyperbaric oxygen"));
        assert!(!concept.to_lowercase().contains("lcd"));
    }

    #[test]
    fn test_expand_specialized_concept_skipped_when_unchanged() {
        let profile = medicare_profile();
        // Nothing to strip: concept equals the query, so only 2 variants
        let variants = expand_specialized("hyperbaric oxygen wound healing", &profile);
        assert_eq!(variants.len(), 2);
    }

    #[test]
    fn test_strip_to_concept_cleanup() {
        let profile = medicare_profile();
        let concept = strip_to_concept("Does the LCD (L33797) cover hyperbaric oxygen?", &profile);
        assert!(!concept.contains('('));
        assert!(!concept.contains("  "));
        assert!(!concept.ends_with('?'));
    }

    #[test]
    fn test_strip_to_concept_can_empty() {
        let profile = medicare_profile();
        assert_eq!(strip_to_concept("the LCD?", &profile), "");
    }

    #[test]
    fn test_detect_source_relevance_peaks_on_codes() {
        let profile = medicare_profile();
        let scores = detect_source_relevance("HCPCS code A1001", &profile);
        let codes = scores["codes"];
        assert!(codes >= scores["iom"]);
        assert!(codes >= scores["mcd"]);
        assert!(codes > 0.0);
    }

    #[test]
    fn test_detect_source_relevance_default_fallback() {
        let profile = auto_profile();
        let scores = detect_source_relevance("hello there", &profile);
        assert_eq!(scores, profile.default_source_relevance);
    }

    #[test]
    fn test_detect_source_relevance_not_default_when_any_match() {
        let profile = auto_profile();
        let scores = detect_source_relevance("premium surcharge discount", &profile);
        assert_ne!(scores, profile.default_source_relevance);
        assert!(scores["rates"] > 0.0);
    }

    #[test]
    fn test_apply_synonyms_appends_in_order() {
        let profile = auto_profile();
        let expanded = apply_synonyms("no-fault states and PIP", &profile);
        assert!(expanded.starts_with("no-fault states and PIP "));
        assert!(expanded.contains("personal injury protection no-fault medical expenses lost wages"));
    }

    #[test]
    fn test_apply_synonyms_unchanged_without_match() {
        let profile = auto_profile();
        let query = "hello there";
        assert_eq!(apply_synonyms(query, &profile), query);
    }

    #[test]
    fn test_expand_cross_source_shape() {
        let profile = auto_profile();
        let query = "What are California's minimum auto liability limits?";
        let variants = expand_cross_source(query, &profile);

        // First entry is the original, unfiltered
        assert_eq!(variants[0].text, query);
        assert!(variants[0].filter.is_none());
        assert!((variants[0].weight - 1.0).abs() < f64::EPSILON);

        // Regulations variant present with its source filter
        let regs = variants
            .iter()
            .find(|v| v.filter.as_ref().is_some_and(|f| f.pinned_source() == Some("regulations")))
            .expect("regulations variant");
        assert!(regs.text.starts_with(query));
        assert!(regs.text.contains("state insurance regulation"));
    }

    #[test]
    fn test_expand_cross_source_default_relevance_fans_wide() {
        let profile = auto_profile();
        // No source signal: default relevance covers all four kinds
        let variants = expand_cross_source("hello there", &profile);
        let filtered = variants.iter().filter(|v| v.filter.is_some()).count();
        assert_eq!(filtered, 4);
    }

    #[test]
    fn test_expand_cross_source_synonym_variant_last() {
        let profile = auto_profile();
        let variants = expand_cross_source("no-fault states and PIP", &profile);
        let last = variants.last().unwrap();
        assert!(last.filter.is_none());
        assert!(last.text.contains("personal injury protection"));
    }

    #[test]
    fn test_expansion_deterministic() {
        let profile = auto_profile();
        let query = "no-fault states and PIP";
        assert_eq!(expand_cross_source(query, &profile), expand_cross_source(query, &profile));
        assert_eq!(
            expand_specialized(query, &profile),
            expand_specialized(query, &profile)
        );
    }
}
