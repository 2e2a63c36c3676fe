//! Error types for retrieval operations.
//!
//! This module provides the error hierarchy using `thiserror` for all
//! retrieval operations including domain resolution, vector-store access,
//! topic loading, and filter parsing.

use thiserror::Error;

/// Result type alias for retrieval operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for retrieval operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Domain registry errors.
    #[error("domain error: {0}")]
    Domain(#[from] DomainError),

    /// Vector-store errors.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Topic definition errors.
    #[error("topic error: {0}")]
    Topic(#[from] TopicError),

    /// Metadata filter errors.
    #[error("filter error: {0}")]
    Filter(#[from] FilterError),

    /// Configuration errors.
    #[error("configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },
}

/// Domain registry errors.
#[derive(Error, Debug)]
pub enum DomainError {
    /// Requested profile name is not registered.
    #[error("unknown domain: {name} (available: {available})")]
    Unknown {
        /// The unrecognized domain name.
        name: String,
        /// Comma-separated list of registered names.
        available: String,
    },

    /// A profile would collide with an already-registered one.
    #[error("duplicate {field} in domain registration: {value}")]
    Duplicate {
        /// Which field collided (`name` or `collection_name`).
        field: &'static str,
        /// The colliding value.
        value: String,
    },

    /// A profile pattern failed to compile.
    #[error("invalid pattern in domain {domain}: {reason}")]
    Pattern {
        /// Domain being constructed.
        domain: String,
        /// Regex compilation failure.
        reason: String,
    },
}

/// Vector-store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Any underlying store failure, surfaced as-is.
    #[error("vector store backend error: {0}")]
    Backend(String),

    /// Stored vector dimension does not match the embedding model.
    #[error("embedding dimension mismatch: store has {expected}, model produces {got}")]
    DimensionMismatch {
        /// Dimension of the stored vectors.
        expected: usize,
        /// Dimension the embedding model produces.
        got: usize,
    },

    /// The collection holds no chunks.
    #[error("collection is empty")]
    EmptyCorpus,
}

/// Topic definition errors. Fatal at registry construction.
#[derive(Error, Debug)]
pub enum TopicError {
    /// Topic pack resource could not be read.
    #[error("topic pack not found: {path}")]
    MissingPack {
        /// Path that was probed.
        path: String,
    },

    /// Topic pack is not valid JSON or violates the schema.
    #[error("malformed topic pack: {reason}")]
    Malformed {
        /// Parse or validation failure.
        reason: String,
    },

    /// A topic pattern failed to compile.
    #[error("invalid pattern in topic {topic}: {reason}")]
    Pattern {
        /// Topic being compiled.
        topic: String,
        /// Regex compilation failure.
        reason: String,
    },
}

/// Metadata filter errors. Raised eagerly before any store call.
#[derive(Error, Debug)]
pub enum FilterError {
    /// Filter contains a comparator the grammar does not define.
    #[error("unknown filter comparator: {comparator}")]
    UnknownComparator {
        /// The offending `$`-prefixed key.
        comparator: String,
    },

    /// Filter clause value is not a scalar.
    #[error("filter value for {key} must be a scalar")]
    NonScalarValue {
        /// Key whose value was rejected.
        key: String,
    },
}

impl From<serde_json::Error> for TopicError {
    fn from(err: serde_json::Error) -> Self {
        Self::Malformed {
            reason: err.to_string(),
        }
    }
}
