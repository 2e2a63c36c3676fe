//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// insurag: domain-aware hybrid retrieval over regulatory document corpora.
///
/// Loads a JSONL corpus into an in-memory store and runs hybrid
/// (semantic + BM25) retrieval with domain-aware query expansion.
#[derive(Parser, Debug)]
#[command(name = "insurag")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to a JSONL corpus file (one chunk object per line).
    #[arg(short, long, env = "INSURAG_CORPUS", global = true)]
    pub corpus: Option<PathBuf>,

    /// Output format (text, json).
    #[arg(long, default_value = "text", global = true)]
    pub format: String,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List registered domains.
    Domains,

    /// Show corpus statistics.
    Status,

    /// Retrieve chunks for a query.
    Query {
        /// The natural-language query.
        query: String,

        /// Number of chunks to return (1-50).
        #[arg(short, default_value = "8")]
        k: usize,

        /// Domain profile name.
        #[arg(short, long, env = "DEFAULT_DOMAIN")]
        domain: Option<String>,

        /// Metadata filter clauses, `key=value` (repeatable).
        #[arg(short, long = "filter")]
        filters: Vec<String>,

        /// Deadline for the retrieval call, in milliseconds.
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Show raw semantic distances instead of the hybrid ranking.
        #[arg(long)]
        scores: bool,
    },
}
