//! Environment-driven configuration.
//!
//! The core reads a small set of environment variables; everything else is
//! supplied programmatically through the builder. Chunk sizing options are
//! read only to pass through to the external chunker.

use crate::error::{Error, Result};
use std::env;
use std::path::PathBuf;

/// Default fallback domain when none is requested or the name is unknown.
pub const DEFAULT_DOMAIN: &str = "medicare";

/// Default floor for `k_final` on the specialized retrieval path.
pub const DEFAULT_SPECIALIZED_K: usize = 16;

/// Default chunk size passed through to the external chunker.
pub const DEFAULT_CHUNK_SIZE: usize = 1500;

/// Default chunk overlap passed through to the external chunker.
pub const DEFAULT_CHUNK_OVERLAP: usize = 300;

/// Retrieval configuration.
#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    /// Identifier of the embedding model; must match the stored vectors.
    pub embedding_model: String,
    /// Fallback profile name for unknown or absent domain requests.
    pub default_domain: String,
    /// Floor for `k_final` on the specialized path (`LCD_RETRIEVAL_K`).
    pub specialized_k: usize,
    /// Chunk size honored by the external chunker (`LCD_CHUNK_SIZE`).
    pub chunk_size: usize,
    /// Chunk overlap honored by the external chunker (`LCD_CHUNK_OVERLAP`).
    pub chunk_overlap: usize,
    /// Optional directory of topic-pack overrides (`<dir>/<domain>_topics.json`).
    pub topic_dir: Option<PathBuf>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            embedding_model: "all-MiniLM-L6-v2".to_string(),
            default_domain: DEFAULT_DOMAIN.to_string(),
            specialized_k: DEFAULT_SPECIALIZED_K,
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            topic_dir: None,
        }
    }
}

impl RetrievalConfig {
    /// Builds a configuration from the process environment.
    ///
    /// Recognized variables: `EMBEDDING_MODEL`, `DEFAULT_DOMAIN`,
    /// `LCD_RETRIEVAL_K`, `LCD_CHUNK_SIZE`, `LCD_CHUNK_OVERLAP`,
    /// `INSURAG_TOPIC_DIR`. `LOCAL_LLM_*` variables are not consumed.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` when a numeric variable does not parse.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(model) = env::var("EMBEDDING_MODEL")
            && !model.is_empty()
        {
            config.embedding_model = model;
        }
        if let Ok(domain) = env::var("DEFAULT_DOMAIN")
            && !domain.is_empty()
        {
            config.default_domain = domain;
        }
        config.specialized_k = read_usize("LCD_RETRIEVAL_K", config.specialized_k)?;
        config.chunk_size = read_usize("LCD_CHUNK_SIZE", config.chunk_size)?;
        config.chunk_overlap = read_usize("LCD_CHUNK_OVERLAP", config.chunk_overlap)?;
        if let Ok(dir) = env::var("INSURAG_TOPIC_DIR")
            && !dir.is_empty()
        {
            config.topic_dir = Some(PathBuf::from(dir));
        }

        Ok(config)
    }
}

fn read_usize(name: &str, default: usize) -> Result<usize> {
    match env::var(name) {
        Ok(raw) if !raw.is_empty() => raw.parse().map_err(|_| Error::Config {
            message: format!("{name} must be an integer, got {raw:?}"),
        }),
        _ => Ok(default),
    }
}
