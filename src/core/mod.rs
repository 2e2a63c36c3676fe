//! Core domain types.
//!
//! The chunk data model shared by every retrieval component.

mod chunk;

pub use chunk::{Chunk, ChunkKey, DocType, MetaValue, Metadata};
