//! BM25 keyword retriever.
//!
//! In-memory inverted index over the chunk corpus. Tokenization is
//! acronym-preserving: lowercase, alphanumeric word segments only, tokens
//! shorter than 2 dropped, no stemming (stemming would collide acronyms
//! like "PIP" with words like "pipe"). Query tokenization mirrors indexing.

use crate::core::Chunk;
use crate::error::Result;
use crate::store::{MetadataFilter, VectorStore};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use unicode_segmentation::UnicodeSegmentation;

/// Term-frequency saturation parameter.
pub const BM25_K1: f32 = 1.5;

/// Length normalization parameter.
pub const BM25_B: f32 = 0.75;

/// Minimum token length retained by the tokenizer.
const MIN_TOKEN_LEN: usize = 2;

/// Tokenizes text for indexing and querying.
///
/// Splits on unicode word bounds, lowercases, keeps alphanumeric segments
/// of length >= 2.
#[must_use]
pub fn tokenize(text: &str) -> Vec<String> {
    text.unicode_words()
        .map(str::to_lowercase)
        .flat_map(|word| {
            // unicode_words keeps word-internal punctuation (e.g. "don't");
            // split the remainder on anything non-alphanumeric.
            word.split(|c: char| !c.is_alphanumeric())
                .filter(|t| t.chars().count() >= MIN_TOKEN_LEN)
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Okapi BM25 inverted index over a chunk corpus.
pub struct Bm25Index {
    /// term -> (record ordinal -> term frequency)
    postings: HashMap<String, HashMap<usize, u32>>,
    doc_lengths: Vec<u32>,
    avg_doc_len: f32,
    chunks: Vec<Chunk>,
}

impl Bm25Index {
    /// Builds the index from a chunk corpus.
    ///
    /// Building twice from the same corpus yields an identical index.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn build(chunks: Vec<Chunk>) -> Self {
        let mut postings: HashMap<String, HashMap<usize, u32>> = HashMap::new();
        let mut doc_lengths = Vec::with_capacity(chunks.len());

        for (ordinal, chunk) in chunks.iter().enumerate() {
            let tokens = tokenize(&chunk.content);
            doc_lengths.push(u32::try_from(tokens.len()).unwrap_or(u32::MAX));
            for token in tokens {
                *postings.entry(token).or_default().entry(ordinal).or_insert(0) += 1;
            }
        }

        let avg_doc_len = if doc_lengths.is_empty() {
            0.0
        } else {
            doc_lengths.iter().map(|&l| l as f32).sum::<f32>() / doc_lengths.len() as f32
        };

        Self {
            postings,
            doc_lengths,
            avg_doc_len,
            chunks,
        }
    }

    /// Number of indexed chunks.
    #[must_use]
    pub fn doc_count(&self) -> usize {
        self.chunks.len()
    }

    /// True when no chunks are indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Returns the top-`k` chunks by BM25 score, highest first.
    ///
    /// The metadata filter restricts the candidate set *before* scoring;
    /// post-filtering would lose recall when `k` is small. Chunks that
    /// match no query term are not returned.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn search(
        &self,
        query: &str,
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Vec<(Chunk, f32)> {
        let terms = tokenize(query);
        if terms.is_empty() || self.chunks.is_empty() {
            return Vec::new();
        }

        let candidate: Vec<bool> = self
            .chunks
            .iter()
            .map(|c| filter.is_none_or(|f| f.matches(&c.metadata)))
            .collect();
        let n = candidate.iter().filter(|&&c| c).count();
        if n == 0 {
            return Vec::new();
        }

        let mut scores: HashMap<usize, f32> = HashMap::new();
        for term in &terms {
            let Some(posting) = self.postings.get(term) else {
                continue;
            };
            let df = posting.keys().filter(|&&ord| candidate[ord]).count();
            if df == 0 {
                continue;
            }
            let idf = (1.0 + (n as f32 - df as f32 + 0.5) / (df as f32 + 0.5)).ln();
            for (&ordinal, &tf) in posting {
                if !candidate[ordinal] {
                    continue;
                }
                let tf = tf as f32;
                let doc_len = self.doc_lengths[ordinal] as f32;
                let norm = BM25_K1 * (1.0 - BM25_B + BM25_B * doc_len / self.avg_doc_len.max(1.0));
                *scores.entry(ordinal).or_insert(0.0) += idf * (tf * (BM25_K1 + 1.0)) / (tf + norm);
            }
        }

        let mut ranked: Vec<(usize, f32)> = scores.into_iter().collect();
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| self.chunks[a.0].key().cmp(&self.chunks[b.0].key()))
        });
        ranked.truncate(k);

        ranked
            .into_iter()
            .map(|(ordinal, score)| (self.chunks[ordinal].clone(), score))
            .collect()
    }
}

/// Lazily-built shared BM25 index.
///
/// The first caller builds under the lock; concurrent callers block on the
/// same lock and then reuse the finished index. The index is rebuilt only
/// when the store's chunk count has changed.
#[derive(Default)]
pub struct KeywordIndex {
    inner: Mutex<Option<Arc<Bm25Index>>>,
}

impl KeywordIndex {
    /// Creates an empty, not-yet-built index handle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the index, building (or rebuilding) it from the store when
    /// needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the corpus dump fails.
    pub fn get_or_build(&self, store: &dyn VectorStore) -> Result<Arc<Bm25Index>> {
        let mut guard = self.inner.lock().expect("keyword index lock poisoned");
        let current_count = store.count()?;
        if let Some(index) = guard.as_ref()
            && index.doc_count() == current_count
        {
            return Ok(Arc::clone(index));
        }
        let index = Arc::new(Bm25Index::build(store.export_chunks()?));
        *guard = Some(Arc::clone(&index));
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Vec<Chunk> {
        vec![
            Chunk::new("reg_ca", 0, "California minimum liability limits are 15/30/5")
                .with_meta("source", "regulations")
                .with_meta("state", "CA"),
            Chunk::new("reg_fl", 0, "Florida is a no-fault state requiring PIP coverage")
                .with_meta("source", "regulations")
                .with_meta("state", "FL"),
            Chunk::new("form_pap", 0, "personal auto policy PAP liability coverage form")
                .with_meta("source", "forms"),
            Chunk::new("rate_1", 0, "premium surcharge factors and liability rate filings")
                .with_meta("source", "rates"),
        ]
    }

    #[test]
    fn test_tokenize_basics() {
        assert_eq!(tokenize("Hello, World!"), vec!["hello", "world"]);
        assert_eq!(tokenize("PIP coverage"), vec!["pip", "coverage"]);
        // hyphenated words split into their alphanumeric parts
        assert_eq!(tokenize("no-fault"), vec!["no", "fault"]);
    }

    #[test]
    fn test_tokenize_drops_short_tokens() {
        // "a" and "I" are shorter than the minimum token length
        assert_eq!(tokenize("a I am ok"), vec!["am", "ok"]);
    }

    #[test]
    fn test_tokenize_no_stemming() {
        // Acronyms must survive verbatim; "PIP" must not become "pipe"-adjacent
        assert_eq!(tokenize("PIP pipes"), vec!["pip", "pipes"]);
    }

    #[test]
    fn test_search_ranks_matching_doc_first() {
        let index = Bm25Index::build(corpus());
        let results = index.search("no-fault PIP", 4, None);
        assert!(!results.is_empty());
        assert_eq!(results[0].0.doc_id, "reg_fl");
    }

    #[test]
    fn test_search_no_match_is_empty() {
        let index = Bm25Index::build(corpus());
        assert!(index.search("zzz qqq", 4, None).is_empty());
        assert!(index.search("", 4, None).is_empty());
    }

    #[test]
    fn test_search_filter_before_scoring() {
        let index = Bm25Index::build(corpus());
        let filter = MetadataFilter::equals("source", "forms");
        let results = index.search("liability", 4, Some(&filter));
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0.doc_id, "form_pap");
    }

    #[test]
    fn test_search_filter_no_candidates() {
        let index = Bm25Index::build(corpus());
        let filter = MetadataFilter::equals("source", "claims");
        assert!(index.search("liability", 4, Some(&filter)).is_empty());
    }

    #[test]
    fn test_search_truncates_to_k() {
        let index = Bm25Index::build(corpus());
        let results = index.search("liability", 1, None);
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn test_build_deterministic() {
        let a = Bm25Index::build(corpus());
        let b = Bm25Index::build(corpus());
        let ra: Vec<_> = a.search("liability coverage", 4, None);
        let rb: Vec<_> = b.search("liability coverage", 4, None);
        let keys_a: Vec<_> = ra.iter().map(|(c, _)| c.key()).collect();
        let keys_b: Vec<_> = rb.iter().map(|(c, _)| c.key()).collect();
        assert_eq!(keys_a, keys_b);
    }

    #[test]
    fn test_empty_index() {
        let index = Bm25Index::build(Vec::new());
        assert!(index.is_empty());
        assert!(index.search("anything", 4, None).is_empty());
    }

    mod keyword_index {
        use super::*;
        use crate::embedding::{DEFAULT_DIMENSIONS, HashEmbedder};
        use crate::store::MemoryVectorStore;
        use std::sync::Arc;

        #[test]
        fn test_build_once_and_rebuild_on_count_change() {
            let store = MemoryVectorStore::new(Arc::new(HashEmbedder::new(DEFAULT_DIMENSIONS)));
            store.add_chunks(corpus()).unwrap();

            let keyword = KeywordIndex::new();
            let first = keyword.get_or_build(&store).unwrap();
            let second = keyword.get_or_build(&store).unwrap();
            assert!(Arc::ptr_eq(&first, &second));

            store
                .add_chunks(vec![Chunk::new("new_doc", 0, "towing roadside assistance")])
                .unwrap();
            let third = keyword.get_or_build(&store).unwrap();
            assert!(!Arc::ptr_eq(&second, &third));
            assert_eq!(third.doc_count(), 5);
        }
    }
}
