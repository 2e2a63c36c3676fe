//! Chunk representation for retrieval.
//!
//! Chunks are the atomic unit stored in the vector index: a contiguous
//! piece of a source document plus its metadata. Chunks are immutable once
//! written; `(doc_id, chunk_index)` is the global primary key.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Scalar metadata value.
///
/// Metadata maps string keys to scalars only; nested structures are not
/// part of the store contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    /// String value.
    Str(String),
    /// Integer value.
    Int(i64),
    /// Floating-point value.
    Float(f64),
    /// Boolean value.
    Bool(bool),
}

impl MetaValue {
    /// Returns the string form if this value is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for MetaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => write!(f, "{s}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for MetaValue {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for MetaValue {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<i64> for MetaValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

/// Chunk metadata: string keys to scalar values, deterministically ordered.
pub type Metadata = BTreeMap<String, MetaValue>;

/// Document type of a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DocType {
    /// An ordinary content chunk.
    #[default]
    Chunk,
    /// A synthesized per-document summary.
    DocumentSummary,
    /// A synthesized per-topic summary, addressable as `topic_<name>`.
    TopicSummary,
}

impl DocType {
    /// Metadata string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Chunk => "chunk",
            Self::DocumentSummary => "document_summary",
            Self::TopicSummary => "topic_summary",
        }
    }

    /// Parses the metadata string form. Unrecognized values read as `Chunk`.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "document_summary" => Self::DocumentSummary,
            "topic_summary" => Self::TopicSummary,
            _ => Self::Chunk,
        }
    }

    /// True for either summary kind.
    #[must_use]
    pub const fn is_summary(self) -> bool {
        matches!(self, Self::DocumentSummary | Self::TopicSummary)
    }
}

/// Global primary key of a chunk: `(doc_id, chunk_index)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkKey {
    /// Source document identifier.
    pub doc_id: String,
    /// Position within that document.
    pub chunk_index: u32,
}

impl fmt::Display for ChunkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.doc_id, self.chunk_index)
    }
}

/// A chunk of a source document plus its metadata.
///
/// The embedding vector lives in the vector store, keyed by this chunk;
/// chunks returned from retrieval do not carry vectors.
///
/// # Examples
///
/// ```
/// use insurag::core::Chunk;
///
/// let chunk = Chunk::new("lcd_l33797", 0, "Hyperbaric oxygen therapy is covered for...");
/// assert_eq!(chunk.key().to_string(), "lcd_l33797#0");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Source document identifier.
    pub doc_id: String,

    /// Position within the source document.
    pub chunk_index: u32,

    /// UTF-8 chunk text.
    pub content: String,

    /// Scalar metadata.
    #[serde(default)]
    pub metadata: Metadata,
}

impl Chunk {
    /// Creates a new chunk with empty metadata.
    #[must_use]
    pub fn new(doc_id: &str, chunk_index: u32, content: &str) -> Self {
        Self {
            doc_id: doc_id.to_string(),
            chunk_index,
            content: content.to_string(),
            metadata: Metadata::new(),
        }
    }

    /// Adds a metadata entry, builder style.
    #[must_use]
    pub fn with_meta(mut self, key: &str, value: impl Into<MetaValue>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    /// Returns the primary key `(doc_id, chunk_index)`.
    #[must_use]
    pub fn key(&self) -> ChunkKey {
        ChunkKey {
            doc_id: self.doc_id.clone(),
            chunk_index: self.chunk_index,
        }
    }

    /// Returns a metadata value as a string, if present and a string.
    #[must_use]
    pub fn meta_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(MetaValue::as_str)
    }

    /// The `source` metadata value (source kind), if any.
    #[must_use]
    pub fn source(&self) -> Option<&str> {
        self.meta_str("source")
    }

    /// The `doc_type` metadata value, defaulting to `Chunk`.
    #[must_use]
    pub fn doc_type(&self) -> DocType {
        self.meta_str("doc_type").map_or_else(DocType::default, DocType::parse)
    }

    /// The single `topic_cluster` of a summary chunk, if set.
    #[must_use]
    pub fn topic_cluster(&self) -> Option<&str> {
        self.meta_str("topic_cluster")
    }

    /// The comma-separated `topic_clusters` of an ordinary chunk, split.
    #[must_use]
    pub fn topic_clusters(&self) -> Vec<&str> {
        self.meta_str("topic_clusters")
            .map(|s| s.split(',').filter(|t| !t.is_empty()).collect())
            .unwrap_or_default()
    }

    /// True when this chunk is a summary whose topic intersects `topics`.
    #[must_use]
    pub fn is_summary_for(&self, topics: &[String]) -> bool {
        if !self.doc_type().is_summary() {
            return false;
        }
        if let Some(cluster) = self.topic_cluster()
            && topics.iter().any(|t| t == cluster)
        {
            return true;
        }
        self.topic_clusters()
            .iter()
            .any(|c| topics.iter().any(|t| t == c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_new() {
        let chunk = Chunk::new("doc1", 3, "some text");
        assert_eq!(chunk.doc_id, "doc1");
        assert_eq!(chunk.chunk_index, 3);
        assert_eq!(chunk.content, "some text");
        assert!(chunk.metadata.is_empty());
    }

    #[test]
    fn test_chunk_key_ordering() {
        let a = Chunk::new("a", 2, "").key();
        let b = Chunk::new("a", 10, "").key();
        let c = Chunk::new("b", 0, "").key();
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn test_with_meta_accessors() {
        let chunk = Chunk::new("doc1", 0, "text")
            .with_meta("source", "mcd")
            .with_meta("chapter", 7_i64);
        assert_eq!(chunk.source(), Some("mcd"));
        assert_eq!(chunk.metadata.get("chapter"), Some(&MetaValue::Int(7)));
        assert_eq!(chunk.meta_str("chapter"), None);
    }

    #[test]
    fn test_doc_type_round_trip() {
        for dt in [DocType::Chunk, DocType::DocumentSummary, DocType::TopicSummary] {
            assert_eq!(DocType::parse(dt.as_str()), dt);
        }
        assert_eq!(DocType::parse("unknown"), DocType::Chunk);
    }

    #[test]
    fn test_doc_type_default_when_missing() {
        let chunk = Chunk::new("doc1", 0, "text");
        assert_eq!(chunk.doc_type(), DocType::Chunk);
        assert!(!chunk.doc_type().is_summary());
    }

    #[test]
    fn test_topic_clusters_split() {
        let chunk = Chunk::new("doc1", 0, "text").with_meta("topic_clusters", "wound_care,imaging");
        assert_eq!(chunk.topic_clusters(), vec!["wound_care", "imaging"]);

        let untagged = Chunk::new("doc2", 0, "text");
        assert!(untagged.topic_clusters().is_empty());
    }

    #[test]
    fn test_is_summary_for() {
        let topics = vec!["wound_care".to_string()];

        let summary = Chunk::new("topic_wound_care", 0, "summary")
            .with_meta("doc_type", "topic_summary")
            .with_meta("topic_cluster", "wound_care");
        assert!(summary.is_summary_for(&topics));

        let doc_summary = Chunk::new("doc1", 0, "summary")
            .with_meta("doc_type", "document_summary")
            .with_meta("topic_clusters", "imaging,wound_care");
        assert!(doc_summary.is_summary_for(&topics));

        let plain = Chunk::new("doc2", 0, "text").with_meta("topic_clusters", "wound_care");
        assert!(!plain.is_summary_for(&topics));

        let other = Chunk::new("topic_imaging", 0, "summary")
            .with_meta("doc_type", "topic_summary")
            .with_meta("topic_cluster", "imaging");
        assert!(!other.is_summary_for(&topics));
    }

    #[test]
    fn test_chunk_serialization() {
        let chunk = Chunk::new("doc1", 0, "text").with_meta("source", "iom");
        let json = serde_json::to_string(&chunk).unwrap();
        let back: Chunk = serde_json::from_str(&json).unwrap();
        assert_eq!(back, chunk);
    }

    #[test]
    fn test_metadata_json_scalars() {
        let json = r#"{"doc_id":"d","chunk_index":0,"content":"c",
            "metadata":{"source":"codes","chapter":4,"score":0.5,"active":true}}"#;
        let chunk: Chunk = serde_json::from_str(json).unwrap();
        assert_eq!(chunk.metadata.get("chapter"), Some(&MetaValue::Int(4)));
        assert_eq!(chunk.metadata.get("score"), Some(&MetaValue::Float(0.5)));
        assert_eq!(chunk.metadata.get("active"), Some(&MetaValue::Bool(true)));
    }
}
