//! # Lorekeep CLI Module
//!
//! This module implements the CLI interface for Lorekeep.
//!
//! ## Available Commands
//!
//! - `append` - Append entries from a JSONL file or an inline JSON object
//! - `import` - Validate a JSON/JSONL file and append the valid entries
//! - `export` - Write entries as JSON or Markdown
//! - `deprecate` - Mark an entry deprecated
//! - `get` - Show the current record for an id
//! - `list` - List entries by category/tags
//! - `search` - Keyword search
//! - `stream` - Filter raw log records without materializing
//! - `summary` - Token-reduced view of an entry
//! - `related` / `dependencies` / `dependents` - Graph traversal
//! - `concept` / `tag` - Lookup by related concept or tag
//! - `network` - Subgraph around an entry
//! - `stats` - Graph statistics (default)
//! - `count` - Number of entries

mod commands;

use crate::config::{Config, ConfigError};
use clap::builder::RangedU64ValueParser;
use clap::{Args, Parser, Subcommand};
use lorekeep_core::{EntryFilter, MemoryError, MemoryStore};
use std::io::Write;
use std::path::PathBuf;
use thiserror::Error;

pub use commands::*;

// =============================================================================
// ERRORS
// =============================================================================

/// Errors surfaced by CLI commands.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Memory(#[from] MemoryError),

    /// Bad command input (unreadable file, missing argument).
    #[error("Input error: {0}")]
    Input(String),

    #[error("JSON output error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Output error: {0}")]
    Output(#[from] std::io::Error),
}

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Lorekeep - process memory for long-running agent work
///
/// Records decisions, lessons and patterns in an append-only JSONL log and
/// answers queries over the current state and the link graph.
#[derive(Parser, Debug)]
#[command(name = "lorekeep")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to a config file (default: ./lorekeep.toml if present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the process memory log (overrides the config file)
    #[arg(short = 'M', long, global = true)]
    pub memory: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Category/tag/deprecation filter shared by listing commands.
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Exact entry type to keep
    #[arg(short = 't', long)]
    pub category: Option<String>,

    /// Required tag (repeatable; all must match)
    #[arg(short = 'g', long = "tag")]
    pub tags: Vec<String>,

    /// Include deprecated entries
    #[arg(long)]
    pub include_deprecated: bool,
}

impl FilterArgs {
    #[must_use]
    pub fn to_filter(&self) -> EntryFilter {
        let filter = EntryFilter::new()
            .tags(self.tags.iter().cloned())
            .include_deprecated(self.include_deprecated);
        match &self.category {
            Some(category) => filter.category(category.clone()),
            None => filter,
        }
    }
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Append entries to the log
    Append {
        /// JSONL file with one entry per line
        #[arg(short, long, conflicts_with = "entry", required_unless_present = "entry")]
        file: Option<PathBuf>,

        /// A single entry as a JSON object
        #[arg(short, long)]
        entry: Option<String>,
    },

    /// Validate entries from a JSON or JSONL file and append the valid ones
    Import {
        /// Input file (JSON array or object, or JSONL)
        file: PathBuf,

        /// Input format: json or jsonl (default: from the file extension)
        #[arg(long)]
        format: Option<String>,

        /// Validate only, write nothing
        #[arg(long)]
        dry_run: bool,
    },

    /// Export entries as JSON or Markdown
    Export {
        /// Export format (json, markdown)
        #[arg(long, default_value = "markdown")]
        format: String,

        /// Output file path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Deprecate an entry (appends a deprecated copy)
    Deprecate {
        /// Entry id
        id: String,

        /// Why the entry no longer applies
        #[arg(short, long)]
        reason: Option<String>,
    },

    /// Show the current record for an id
    Get {
        /// Entry id
        id: String,
    },

    /// List entries in id order
    List {
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Search live entries by keyword (title, summary, tags)
    Search {
        /// Case-insensitive keyword
        keyword: Option<String>,

        /// Exact entry type to keep
        #[arg(short = 't', long)]
        category: Option<String>,

        /// Required tag (repeatable; all must match)
        #[arg(short = 'g', long = "tag")]
        tags: Vec<String>,
    },

    /// Stream raw log records through a filter, in append order
    Stream {
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Token-reduced summary of an entry
    Summary {
        /// Entry id
        id: String,

        /// Word budget, at least 1 (default from config)
        #[arg(short, long, value_parser = RangedU64ValueParser::<usize>::new().range(1..))]
        words: Option<usize>,
    },

    /// Entries reachable from an id within a depth
    Related {
        /// Entry id
        id: String,

        /// Traversal depth (default from config)
        #[arg(short, long)]
        depth: Option<usize>,

        /// Also follow links pointing at each node
        #[arg(short, long)]
        reverse: bool,
    },

    /// Everything an entry depends on, transitively
    Dependencies {
        /// Entry id
        id: String,
    },

    /// Entries that link directly to an id
    Dependents {
        /// Entry id
        id: String,
    },

    /// Live entries with a matching related concept
    Concept {
        /// Concept substring (case-insensitive)
        concept: String,
    },

    /// Live entries carrying a tag
    Tag {
        /// Tag
        tag: String,
    },

    /// Subgraph around an entry, for visualization
    Network {
        /// Entry id
        id: String,

        /// Hops in either direction (default from config)
        #[arg(short, long)]
        depth: Option<usize>,
    },

    /// Show graph statistics
    Stats,

    /// Count entries
    Count {
        /// Include deprecated entries
        #[arg(long)]
        include_deprecated: bool,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments, writing results to stdout.
pub fn execute(cli: Cli) -> Result<(), AppError> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    execute_to(cli, &mut out)
}

/// Execute the CLI with parsed arguments, writing results to `out`.
pub fn execute_to(cli: Cli, out: &mut dyn Write) -> Result<(), AppError> {
    let config = Config::load(cli.config.as_deref())?;
    let path = cli.memory.unwrap_or(config.memory.path);
    tracing::debug!(path = %path.display(), "opening process memory");

    let mut store = MemoryStore::new(path);
    let ctx = Context {
        json: cli.json,
        query: config.query,
    };

    match cli.command {
        Some(Commands::Append { file, entry }) => {
            cmd_append(&mut store, &ctx, out, file.as_deref(), entry.as_deref())
        }
        Some(Commands::Import {
            file,
            format,
            dry_run,
        }) => cmd_import(&mut store, &ctx, out, &file, format.as_deref(), dry_run),
        Some(Commands::Export {
            format,
            output,
            filter,
        }) => cmd_export(
            &mut store,
            &ctx,
            out,
            &format,
            output.as_deref(),
            &filter.to_filter(),
        ),
        Some(Commands::Deprecate { id, reason }) => {
            cmd_deprecate(&mut store, &ctx, out, &id, reason.as_deref())
        }
        Some(Commands::Get { id }) => cmd_get(&mut store, &ctx, out, &id),
        Some(Commands::List { filter }) => cmd_list(&mut store, &ctx, out, &filter.to_filter()),
        Some(Commands::Search {
            keyword,
            category,
            tags,
        }) => cmd_search(&mut store, &ctx, out, keyword, category, tags),
        Some(Commands::Stream { filter }) => cmd_stream(&store, &ctx, out, filter.to_filter()),
        Some(Commands::Summary { id, words }) => cmd_summary(&mut store, &ctx, out, &id, words),
        Some(Commands::Related { id, depth, reverse }) => {
            cmd_related(&mut store, &ctx, out, &id, depth, reverse)
        }
        Some(Commands::Dependencies { id }) => cmd_dependencies(&mut store, &ctx, out, &id),
        Some(Commands::Dependents { id }) => cmd_dependents(&mut store, &ctx, out, &id),
        Some(Commands::Concept { concept }) => cmd_concept(&mut store, &ctx, out, &concept),
        Some(Commands::Tag { tag }) => cmd_tag(&mut store, &ctx, out, &tag),
        Some(Commands::Network { id, depth }) => cmd_network(&mut store, &ctx, out, &id, depth),
        Some(Commands::Count { include_deprecated }) => {
            cmd_count(&mut store, &ctx, out, include_deprecated)
        }
        Some(Commands::Stats) | None => {
            // No subcommand - show stats by default
            cmd_stats(&mut store, &ctx, out)
        }
    }
}
