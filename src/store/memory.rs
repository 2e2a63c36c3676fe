//! In-memory vector store.
//!
//! Cosine-similarity store over an [`Embedder`], used by the CLI and the
//! test corpus. Ranking is fully deterministic: score descending, then
//! `(doc_id, chunk_index)` ascending.

use crate::core::{Chunk, ChunkKey};
use crate::embedding::{Embedder, cosine_similarity};
use crate::error::{Result, StoreError};
use crate::store::{MetadataFilter, VectorStore};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

struct Record {
    chunk: Chunk,
    embedding: Vec<f32>,
}

/// In-memory cosine-similarity vector store.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use insurag::core::Chunk;
/// use insurag::embedding::{HashEmbedder, DEFAULT_DIMENSIONS};
/// use insurag::store::{MemoryVectorStore, VectorStore};
///
/// let store = MemoryVectorStore::new(Arc::new(HashEmbedder::new(DEFAULT_DIMENSIONS)));
/// store.add_chunks(vec![Chunk::new("doc1", 0, "liability limits")]).unwrap();
/// assert_eq!(store.count().unwrap(), 1);
/// ```
pub struct MemoryVectorStore {
    embedder: Arc<dyn Embedder>,
    records: RwLock<Vec<Record>>,
}

impl MemoryVectorStore {
    /// Creates an empty store over the given embedder.
    #[must_use]
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            records: RwLock::new(Vec::new()),
        }
    }

    /// Embeds and inserts chunks. Re-inserting an existing key replaces it.
    ///
    /// # Errors
    ///
    /// Returns an error if embedding fails.
    pub fn add_chunks(&self, chunks: Vec<Chunk>) -> Result<()> {
        let texts: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        let embeddings = self.embedder.embed_batch(&texts)?;
        let mut records = self.records.write().expect("store lock poisoned");
        for (chunk, embedding) in chunks.into_iter().zip(embeddings) {
            upsert(&mut records, chunk, embedding);
        }
        Ok(())
    }

    /// Inserts a chunk with a caller-supplied raw vector.
    ///
    /// The vector's dimension is taken as-is, which lets tests seed a
    /// collection whose dimension differs from the query embedder.
    pub fn add_raw(&self, chunk: Chunk, embedding: Vec<f32>) {
        let mut records = self.records.write().expect("store lock poisoned");
        upsert(&mut records, chunk, embedding);
    }
}

fn upsert(records: &mut Vec<Record>, chunk: Chunk, embedding: Vec<f32>) {
    let key = chunk.key();
    if let Some(existing) = records.iter_mut().find(|r| r.chunk.key() == key) {
        existing.chunk = chunk;
        existing.embedding = embedding;
    } else {
        records.push(Record { chunk, embedding });
    }
}

impl VectorStore for MemoryVectorStore {
    fn similarity_search_with_score(
        &self,
        query: &str,
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<(Chunk, f32)>> {
        let query_embedding = self.embedder.embed(query)?;
        let records = self.records.read().expect("store lock poisoned");

        let mut scored: Vec<(ChunkKey, f32)> = records
            .iter()
            .filter(|r| filter.is_none_or(|f| f.matches(&r.chunk.metadata)))
            .map(|r| (r.chunk.key(), cosine_similarity(&query_embedding, &r.embedding)))
            .collect();

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        scored.truncate(k);

        let by_key: HashMap<ChunkKey, &Record> =
            records.iter().map(|r| (r.chunk.key(), r)).collect();
        Ok(scored
            .into_iter()
            .filter_map(|(key, score)| {
                // Distance = 1 - cosine, ascending with decreasing similarity.
                by_key.get(&key).map(|r| (r.chunk.clone(), 1.0 - score))
            })
            .collect())
    }

    fn get_by_ids(&self, ids: &[String]) -> Result<Vec<Chunk>> {
        let records = self.records.read().expect("store lock poisoned");
        Ok(ids
            .iter()
            .filter_map(|id| {
                records
                    .iter()
                    .find(|r| &r.chunk.doc_id == id)
                    .map(|r| r.chunk.clone())
            })
            .collect())
    }

    fn count(&self) -> Result<usize> {
        Ok(self.records.read().expect("store lock poisoned").len())
    }

    fn embedding_dimension(&self) -> Result<Option<usize>> {
        let records = self.records.read().expect("store lock poisoned");
        Ok(records.first().map(|r| r.embedding.len()))
    }

    fn export_chunks(&self) -> Result<Vec<Chunk>> {
        let records = self.records.read().expect("store lock poisoned");
        if records.is_empty() {
            return Err(StoreError::EmptyCorpus.into());
        }
        let mut chunks: Vec<Chunk> = records.iter().map(|r| r.chunk.clone()).collect();
        chunks.sort_by_key(Chunk::key);
        Ok(chunks)
    }
}
