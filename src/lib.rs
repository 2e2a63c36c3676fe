//! # insurag
//!
//! Domain-aware hybrid retrieval core for regulatory document Q&A.
//!
//! Given a natural-language query and a populated vector store whose
//! chunks carry rich metadata, the retriever returns a ranked short list
//! of chunks for downstream grounded answer generation. A single
//! nearest-neighbor search underserves this corpus: domain vocabulary is
//! acronym-heavy, content is fragmented across chapters and
//! jurisdictions, and sources differ in register. The core answers with:
//!
//! - **Query classification and expansion**: specialized-query detection,
//!   topic-directed and cross-source expansion, synonym augmentation
//! - **Hybrid retrieval**: multi-variant source-filtered vector search
//!   fused with BM25 keyword retrieval via Reciprocal Rank Fusion
//! - **Topic anchoring**: deterministic topic-summary injection and
//!   boosting, plus cross-source diversification
//! - **Domain plug-ins**: static profiles (Medicare, auto insurance)
//!   carrying the pattern tables that configure all of the above

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![warn(unsafe_code)]

pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod embedding;
pub mod error;
pub mod keyword;
pub mod query;
pub mod retriever;
pub mod search;
pub mod store;
pub mod topic;

// Re-export commonly used types at crate root
pub use error::{DomainError, Error, FilterError, Result, StoreError, TopicError};

// Re-export core domain types
pub use core::{Chunk, ChunkKey, DocType, MetaValue, Metadata};

// Re-export configuration
pub use config::RetrievalConfig;

// Re-export domain types
pub use domain::{DomainProfile, DomainRegistry};

// Re-export store types
pub use store::{MemoryVectorStore, MetadataFilter, VectorStore};

// Re-export embedding types
pub use embedding::{DEFAULT_DIMENSIONS, Embedder, HashEmbedder, cosine_similarity};

// Re-export retrieval entry points
pub use retriever::{RetrieveOptions, Retriever, RetrieverBuilder};
pub use search::{HybridSearcher, RRF_K, RankedList, RrfConfig, reciprocal_rank_fusion};
