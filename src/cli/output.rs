//! Output formatting for CLI results.

use crate::core::Chunk;
use crate::error::Error;
use serde_json::json;
use std::fmt::Write as _;

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text.
    Text,
    /// One JSON document.
    Json,
}

impl OutputFormat {
    /// Parses a format name; anything unrecognized reads as text.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "json" => Self::Json,
            _ => Self::Text,
        }
    }
}

/// Formats retrieved chunks as numbered context items (the shape the
/// downstream answer generator consumes) or as a JSON array.
#[must_use]
pub fn format_chunks(chunks: &[Chunk], format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(chunks).unwrap_or_else(|_| "[]".to_string())
        }
        OutputFormat::Text => {
            if chunks.is_empty() {
                return "No results.\n".to_string();
            }
            let mut out = String::new();
            for (i, chunk) in chunks.iter().enumerate() {
                let source = chunk.source().unwrap_or("-");
                let _ = writeln!(
                    out,
                    "[{}] {} (source: {source})",
                    i + 1,
                    chunk.key()
                );
                let _ = writeln!(out, "    {}", chunk.content.trim());
            }
            out
        }
    }
}

/// Formats an error for the chosen output format.
#[must_use]
pub fn format_error(err: &Error, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => json!({"error": err.to_string()}).to_string(),
        OutputFormat::Text => err.to_string(),
    }
}
