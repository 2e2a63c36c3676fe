//! Vector retriever facade.
//!
//! A thin, stateless wrapper contract over the external vector store. The
//! store is an opaque approximate-nearest-neighbor index with
//! metadata-filtered search; one collection exists per domain profile,
//! named exactly `profile.collection_name`.

mod filter;
mod memory;

pub use filter::{MetadataFilter, merge_filters};
pub use memory::MemoryVectorStore;

use crate::core::Chunk;
use crate::error::Result;

/// Facade over an external vector store collection.
///
/// Implementations adapt a concrete backend to this contract. Failing
/// store calls propagate as `StoreError::Backend`; the one exception is
/// `get_by_ids`, where missing IDs are a normal case and are silently
/// dropped.
pub trait VectorStore: Send + Sync {
    /// Returns up to `k` chunks ordered by ascending distance.
    ///
    /// Filter semantics: equality for a single key, conjunction when
    /// multiple keys are supplied.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying search fails.
    fn similarity_search(
        &self,
        query: &str,
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<Chunk>> {
        Ok(self
            .similarity_search_with_score(query, k, filter)?
            .into_iter()
            .map(|(chunk, _)| chunk)
            .collect())
    }

    /// Like [`similarity_search`](Self::similarity_search), with the raw
    /// distance for diagnostic UIs. Not used by the fuser.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying search fails.
    fn similarity_search_with_score(
        &self,
        query: &str,
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<(Chunk, f32)>>;

    /// Looks up chunks by `doc_id`. Missing IDs are silently dropped.
    ///
    /// # Errors
    ///
    /// Returns an error only if the underlying lookup itself fails.
    fn get_by_ids(&self, ids: &[String]) -> Result<Vec<Chunk>>;

    /// Number of chunks in the collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the count query fails.
    fn count(&self) -> Result<usize>;

    /// Dimension of the stored vectors, or `None` when the collection is
    /// empty. Used by the dimension-mismatch guard.
    ///
    /// # Errors
    ///
    /// Returns an error if the probe fails.
    fn embedding_dimension(&self) -> Result<Option<usize>>;

    /// Dumps every chunk in the collection, in a stable order.
    ///
    /// Consumed by the keyword indexer to build its inverted index.
    ///
    /// # Errors
    ///
    /// Returns an error if the scan fails.
    fn export_chunks(&self) -> Result<Vec<Chunk>>;
}
