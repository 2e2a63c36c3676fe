//! CLI command execution.
//!
//! Loads the JSONL corpus into the in-memory store, tags untagged chunks
//! with topics at load, and drives the retriever facade.

use crate::cli::output::{OutputFormat, format_chunks};
use crate::cli::parser::{Cli, Commands};
use crate::config::RetrievalConfig;
use crate::core::{Chunk, MetaValue};
use crate::error::{Error, Result};
use crate::embedding::{DEFAULT_DIMENSIONS, HashEmbedder};
use crate::retriever::{Retriever, RetrieveOptions};
use crate::store::{MemoryVectorStore, MetadataFilter};
use crate::topic::tag_with_topics;
use serde_json::json;
use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Executes a parsed CLI invocation and returns its output.
///
/// # Errors
///
/// Returns an error for configuration, corpus, or retrieval failures.
pub fn execute(cli: &Cli) -> Result<String> {
    let format = OutputFormat::parse(&cli.format);
    let config = RetrievalConfig::from_env()?;

    match &cli.command {
        Commands::Domains => {
            let retriever = build_retriever(cli, &config, /* require_corpus */ false)?;
            if format == OutputFormat::Json {
                let mut items = Vec::new();
                for name in retriever.domains() {
                    let profile = retriever.resolve_profile(Some(&name))?;
                    items.push(json!({
                        "name": profile.name,
                        "display_name": profile.display_name,
                        "collection": profile.collection_name,
                        "source_kinds": profile.source_kinds,
                        "states": profile.states,
                        "quick_questions": profile.quick_questions,
                    }));
                }
                return Ok(json!({ "domains": items }).to_string());
            }
            let mut out = String::new();
            for name in retriever.domains() {
                let profile = retriever.resolve_profile(Some(&name))?;
                let _ = writeln!(
                    out,
                    "{name}  ({}, collection: {})",
                    profile.display_name, profile.collection_name
                );
                let _ = writeln!(out, "  sources: {}", profile.source_kinds.join(", "));
                if !profile.states.is_empty() {
                    let _ = writeln!(out, "  states: {}", profile.states.join(", "));
                }
                for question in profile.quick_questions.iter().take(3) {
                    let _ = writeln!(out, "  try: {question}");
                }
            }
            Ok(out)
        }

        Commands::Status => {
            let retriever = build_retriever(cli, &config, true)?;
            let count = retriever.corpus_size()?;
            match format {
                OutputFormat::Json => Ok(json!({"chunks": count}).to_string()),
                OutputFormat::Text => {
                    if count == 0 {
                        Ok("Corpus is empty. Ingest documents before querying.\n".to_string())
                    } else {
                        Ok(format!("{count} chunks in corpus\n"))
                    }
                }
            }
        }

        Commands::Query {
            query,
            k,
            domain,
            filters,
            timeout_ms,
            scores,
        } => {
            let retriever = build_retriever(cli, &config, true)?;
            if retriever.corpus_size()? == 0 {
                return Ok("Corpus is empty. Ingest documents before querying.\n".to_string());
            }

            let mut options = RetrieveOptions::new().with_k(*k);
            if let Some(domain) = domain {
                options = options.with_domain(domain);
            }
            if let Some(filter) = parse_filters(filters)? {
                options = options.with_filter(filter);
            }
            if let Some(ms) = timeout_ms {
                options = options.with_deadline(Instant::now() + Duration::from_millis(*ms));
            }

            if *scores {
                let results = retriever.semantic_search_with_scores(query, &options)?;
                return Ok(format_scored(&results, format));
            }

            let chunks = retriever.retrieve(query, &options)?;
            Ok(format_chunks(&chunks, format))
        }
    }
}

fn build_retriever(cli: &Cli, config: &RetrievalConfig, require_corpus: bool) -> Result<Retriever> {
    let embedder = Arc::new(HashEmbedder::new(DEFAULT_DIMENSIONS));
    let store = MemoryVectorStore::new(embedder.clone());

    match &cli.corpus {
        Some(path) => {
            let chunks = load_corpus(path, config)?;
            store.add_chunks(chunks)?;
        }
        None if require_corpus => {
            return Err(Error::Config {
                message: "no corpus file; pass --corpus <file.jsonl>".to_string(),
            });
        }
        None => {}
    }

    Retriever::builder()
        .store(Arc::new(store))
        .embedder(embedder)
        .config(config.clone())
        .build()
}

/// Reads a JSONL corpus: one chunk object per line, blank lines skipped.
/// Chunks without `topic_clusters` are tagged at load using the default
/// domain's topic definitions.
fn load_corpus(path: &Path, config: &RetrievalConfig) -> Result<Vec<Chunk>> {
    let raw = std::fs::read_to_string(path).map_err(|e| Error::Config {
        message: format!("cannot read corpus {}: {e}", path.display()),
    })?;

    let registry = crate::domain::DomainRegistry::builtin(config)?;
    let profile = registry.get(&config.default_domain)?;

    let mut chunks = Vec::new();
    for (lineno, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let chunk: Chunk = serde_json::from_str(line).map_err(|e| Error::Config {
            message: format!("corpus line {}: {e}", lineno + 1),
        })?;
        if chunk.meta_str("topic_clusters").is_none() && !chunk.doc_type().is_summary() {
            chunks.push(tag_with_topics(&chunk, &profile.topics));
        } else {
            chunks.push(chunk);
        }
    }
    tracing::info!(count = chunks.len(), path = %path.display(), "corpus loaded");
    Ok(chunks)
}

/// Parses repeated `key=value` flags into one conjunction filter.
fn parse_filters(raw: &[String]) -> Result<Option<MetadataFilter>> {
    if raw.is_empty() {
        return Ok(None);
    }
    let mut filter = MetadataFilter::new();
    for clause in raw {
        let Some((key, value)) = clause.split_once('=') else {
            return Err(Error::Config {
                message: format!("filter must be key=value, got {clause:?}"),
            });
        };
        filter = filter.and_equals(key.trim(), MetaValue::Str(value.trim().to_string()));
    }
    Ok(Some(filter))
}

fn format_scored(results: &[(Chunk, f32)], format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => {
            let items: Vec<_> = results
                .iter()
                .map(|(chunk, distance)| json!({"chunk": chunk, "distance": distance}))
                .collect();
            serde_json::to_string_pretty(&items).unwrap_or_else(|_| "[]".to_string())
        }
        OutputFormat::Text => {
            if results.is_empty() {
                return "No results.\n".to_string();
            }
            let mut out = String::new();
            for (i, (chunk, distance)) in results.iter().enumerate() {
                let _ = writeln!(out, "[{}] {} (distance: {distance:.4})", i + 1, chunk.key());
                let _ = writeln!(out, "    {}", chunk.content.trim());
            }
            out
        }
    }
}
