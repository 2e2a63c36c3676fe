//! Retriever facade.
//!
//! The single public entry point used by answer generation and the search
//! UI. Chooses the hybrid path when the keyword index is available and
//! the semantic specialized/plain path otherwise, and owns the
//! cross-cutting guards: empty-query and empty-corpus short-circuits, the
//! embedding-dimension check, and domain fallback.

use crate::config::RetrievalConfig;
use crate::core::Chunk;
use crate::domain::{DomainProfile, DomainRegistry};
use crate::embedding::Embedder;
use crate::error::{Error, Result, StoreError};
use crate::keyword::KeywordIndex;
use crate::search::HybridSearcher;
use crate::store::{MetadataFilter, VectorStore};
use std::sync::{Arc, OnceLock};
use std::time::Instant;

/// Default number of chunks returned.
pub const DEFAULT_K: usize = 8;

/// Upper bound on `k` accepted from callers.
pub const MAX_K: usize = 50;

/// Options for one retrieval call.
#[derive(Debug, Clone, Default)]
pub struct RetrieveOptions {
    /// Number of chunks to return; clamped to `1..=50`. 0 means default.
    pub k: usize,
    /// Caller metadata filter, honored by the baseline variant.
    pub filter: Option<MetadataFilter>,
    /// Domain profile name; unknown names fall back to the default.
    pub domain: Option<String>,
    /// Deadline propagated to outstanding store calls.
    pub deadline: Option<Instant>,
}

impl RetrieveOptions {
    /// Creates options with all defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `k`.
    #[must_use]
    pub const fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    /// Sets the metadata filter.
    #[must_use]
    pub fn with_filter(mut self, filter: MetadataFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Sets the domain.
    #[must_use]
    pub fn with_domain(mut self, domain: &str) -> Self {
        self.domain = Some(domain.to_string());
        self
    }

    /// Sets the deadline.
    #[must_use]
    pub const fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    fn effective_k(&self) -> usize {
        if self.k == 0 {
            DEFAULT_K
        } else {
            self.k.clamp(1, MAX_K)
        }
    }
}

/// Domain-aware hybrid retriever.
pub struct Retriever {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    registry: Arc<DomainRegistry>,
    config: RetrievalConfig,
    keyword: KeywordIndex,
    dimension_guard: OnceLock<std::result::Result<(), (usize, usize)>>,
}

impl std::fmt::Debug for Retriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Retriever")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Retriever {
    /// Starts a builder.
    #[must_use]
    pub fn builder() -> RetrieverBuilder {
        RetrieverBuilder::default()
    }

    /// Retrieves up to `k` chunks for `query`.
    ///
    /// A query that is empty after trimming returns `[]` (logged as an
    /// empty query), as does an empty corpus. Per-variant search failures
    /// degrade to empty lists inside the fuser.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::DimensionMismatch` when the store's vector
    /// dimension does not match the embedding model, and surfaces
    /// corpus-level store failures.
    pub fn retrieve(&self, query: &str, options: &RetrieveOptions) -> Result<Vec<Chunk>> {
        if query.trim().is_empty() {
            tracing::warn!("empty query, returning no results");
            return Ok(Vec::new());
        }

        let profile = self
            .registry
            .resolve(options.domain.as_deref(), &self.config.default_domain)?;

        self.check_dimensions()?;

        if self.store.count()? == 0 {
            tracing::info!(collection = profile.collection_name, "empty corpus");
            return Ok(Vec::new());
        }

        let keyword = match self.keyword.get_or_build(self.store.as_ref()) {
            Ok(index) if !index.is_empty() => Some(index),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(error = %e, "keyword index build failed, semantic-only retrieval");
                None
            }
        };

        let searcher = HybridSearcher::new(Arc::clone(&self.store), keyword, profile);
        searcher.search(
            query,
            options.effective_k(),
            options.filter.as_ref(),
            options.deadline,
        )
    }

    /// Raw semantic search with distances, for diagnostic UIs.
    ///
    /// # Errors
    ///
    /// Surfaces store and dimension failures; does not degrade.
    pub fn semantic_search_with_scores(
        &self,
        query: &str,
        options: &RetrieveOptions,
    ) -> Result<Vec<(Chunk, f32)>> {
        if query.trim().is_empty() {
            tracing::warn!("empty query, returning no results");
            return Ok(Vec::new());
        }
        self.check_dimensions()?;
        self.store
            .similarity_search_with_score(query, options.effective_k(), options.filter.as_ref())
    }

    /// Number of chunks in the active collection.
    ///
    /// # Errors
    ///
    /// Surfaces store failures.
    pub fn corpus_size(&self) -> Result<usize> {
        self.store.count()
    }

    /// The profile a request for `domain` resolves to.
    ///
    /// # Errors
    ///
    /// Returns an error only when the default domain is missing.
    pub fn resolve_profile(&self, domain: Option<&str>) -> Result<Arc<DomainProfile>> {
        self.registry.resolve(domain, &self.config.default_domain)
    }

    /// Registered domain names, sorted.
    #[must_use]
    pub fn domains(&self) -> Vec<String> {
        self.registry.names()
    }

    /// One-shot embedding-dimension guard: the first call probes the
    /// store; later calls reuse the verdict. Mismatches are reported with
    /// both values, never silently corrected.
    fn check_dimensions(&self) -> Result<()> {
        let verdict = self.dimension_guard.get_or_init(|| {
            match self.store.embedding_dimension() {
                Ok(Some(stored)) if stored != self.embedder.dimensions() => {
                    Err((stored, self.embedder.dimensions()))
                }
                // An empty store has no stored dimension to disagree with.
                _ => Ok(()),
            }
        });
        verdict.map_err(|(expected, got)| {
            Error::Store(StoreError::DimensionMismatch { expected, got })
        })
    }
}

/// Builder assembling a [`Retriever`] from its collaborators.
#[derive(Default)]
pub struct RetrieverBuilder {
    store: Option<Arc<dyn VectorStore>>,
    embedder: Option<Arc<dyn Embedder>>,
    registry: Option<Arc<DomainRegistry>>,
    config: Option<RetrievalConfig>,
}

impl RetrieverBuilder {
    /// Sets the vector store.
    #[must_use]
    pub fn store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Sets the embedding model.
    #[must_use]
    pub fn embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Sets the domain registry. Defaults to the built-in registry.
    #[must_use]
    pub fn registry(mut self, registry: Arc<DomainRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Sets the configuration. Defaults to `RetrievalConfig::default()`.
    #[must_use]
    pub fn config(mut self, config: RetrievalConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Builds the retriever.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` when the store or embedder is missing, and
    /// propagates registry construction failures (topic packs are fatal
    /// at startup).
    pub fn build(self) -> Result<Retriever> {
        let store = self.store.ok_or_else(|| Error::Config {
            message: "retriever requires a vector store".to_string(),
        })?;
        let embedder = self.embedder.ok_or_else(|| Error::Config {
            message: "retriever requires an embedder".to_string(),
        })?;
        let config = self.config.unwrap_or_default();
        let registry = match self.registry {
            Some(registry) => registry,
            None => Arc::new(DomainRegistry::builtin(&config)?),
        };
        // Fail fast when the default domain is not registered.
        registry.get(&config.default_domain)?;

        Ok(Retriever {
            store,
            embedder,
            registry,
            config,
            keyword: KeywordIndex::new(),
            dimension_guard: OnceLock::new(),
        })
    }
}
