//! Feature-hashed deterministic embedder.
//!
//! Projects text into a fixed-dimension vector by hashing lexical
//! features: the same tokens the BM25 index uses, adjacent token pairs,
//! and character 4-grams within tokens. Similarity is lexical overlap,
//! not meaning; the point is a reproducible stand-in for the external
//! model so the in-memory store and the test corpus rank identically on
//! every run.

use crate::embedding::Embedder;
use crate::error::Result;
use crate::keyword::tokenize;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Weight of an adjacent token pair relative to a single token.
const PAIR_SCALE: f32 = 0.5;

/// Weight of a character 4-gram relative to a single token.
const GRAM_SCALE: f32 = 0.25;

/// Width of the character n-grams hashed within each token.
const GRAM_WIDTH: usize = 4;

/// Feature-hashed deterministic embedder.
///
/// Tokenization is shared with the keyword retriever, so a query and a
/// chunk that agree for BM25 also agree here. Token pairs keep phrases
/// like "liability limits" distinct from their scattered words; 4-grams
/// soften inflection differences ("determination"/"determinations").
///
/// # Examples
///
/// ```
/// use insurag::embedding::{Embedder, HashEmbedder, DEFAULT_DIMENSIONS};
///
/// let embedder = HashEmbedder::new(DEFAULT_DIMENSIONS);
/// let a = embedder.embed("uninsured motorist").unwrap();
/// let b = embedder.embed("uninsured motorist").unwrap();
/// assert_eq!(a, b);
/// ```
pub struct HashEmbedder {
    dimensions: usize,
}

impl HashEmbedder {
    /// Creates a new feature-hashed embedder with the specified dimensions.
    #[must_use]
    pub const fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    /// Folds one hashed feature into the vector.
    ///
    /// The bucket, sign, and magnitude are drawn from disjoint parts of
    /// the feature hash: high bits pick the bucket, the popcount parity
    /// picks the sign, and the residue mod a prime spreads magnitudes
    /// over [0.5, 1.5) so no feature degenerates to a near-zero weight.
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    fn fold(&self, embedding: &mut [f32], feature: &str, scale: f32) {
        let mut hasher = DefaultHasher::new();
        feature.hash(&mut hasher);
        let hash = hasher.finish();

        let bucket = (hash >> 7) as usize % self.dimensions;
        let sign = if hash.count_ones() % 2 == 0 { 1.0 } else { -1.0 };
        let magnitude = 0.5 + (hash % 997) as f32 / 997.0;
        embedding[bucket] += sign * magnitude * scale;
    }

    fn generate(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.dimensions];
        let tokens = tokenize(text);

        // Single tokens carry the vocabulary signal.
        for token in &tokens {
            self.fold(&mut embedding, token, 1.0);
        }

        // Adjacent token pairs carry the phrase signal.
        for pair in tokens.windows(2) {
            self.fold(&mut embedding, &format!("{} {}", pair[0], pair[1]), PAIR_SCALE);
        }

        // Character 4-grams within a token carry the morphology signal.
        for token in &tokens {
            let chars: Vec<char> = token.chars().collect();
            for window in chars.windows(GRAM_WIDTH) {
                let gram: String = window.iter().collect();
                self.fold(&mut embedding, &gram, GRAM_SCALE);
            }
        }

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut embedding {
                *value /= norm;
            }
        }

        embedding
    }
}

impl Embedder for HashEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.generate(text))
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        use rayon::prelude::*;

        Ok(texts.par_iter().map(|text| self.generate(text)).collect())
    }
}
