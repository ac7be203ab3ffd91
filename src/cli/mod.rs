//! CLI command definitions and parsing
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "quarry",
    version,
    about = "Segmented full-text search with hybrid ranking and grounded answers",
    long_about = "Quarry indexes documents into immutable segments, ranks keyword matches with \
                  TF-IDF, fuses them with semantic similarity, compacts segments by merging, \
                  and answers questions from the best matching documents."
)]
pub struct Cli {
    /// Global config file path (defaults to ~/.config/quarry/config.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Profile to apply on top of the config file
    #[arg(short, long, global = true)]
    pub profile: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Index a file of documents as one new segment
    Seed {
        /// JSON array or JSON Lines file of {url, title, content} objects
        file: PathBuf,
    },

    /// Index a single document as one new segment
    Add {
        /// Document URL (its identity)
        #[arg(long)]
        url: String,

        /// Document title
        #[arg(long)]
        title: String,

        /// File holding the document body
        content_file: PathBuf,
    },

    /// Search the index
    Search {
        /// Search query text
        query: String,

        /// Maximum number of results to return (defaults to search.default_limit)
        #[arg(short, long)]
        limit: Option<usize>,

        /// Show results in JSON format
        #[arg(long)]
        json: bool,

        /// Print context snippets for each keyword hit
        #[arg(short, long)]
        snippets: bool,
    },

    /// Merge two live segments into a new one
    Merge {
        /// First segment id
        a: i64,

        /// Second segment id
        b: i64,
    },

    /// List live segments
    Segments {
        /// Show results in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Show database statistics
    Stats,

    /// Embed every document that has no stored embedding
    Embed,

    /// Answer a question from the best matching documents
    Ask {
        /// Question to ask
        question: String,

        /// Number of documents given to the LLM (defaults to rag.top_k)
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show {
        /// Show only a specific section
        #[arg(short, long)]
        section: Option<String>,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (defaults to standard location)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Initialize default configuration
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_search_defaults() {
        let cli = Cli::try_parse_from(["quarry", "search", "potato farming"]).unwrap();
        match cli.command {
            Commands::Search {
                query,
                limit,
                json,
                snippets,
            } => {
                assert_eq!(query, "potato farming");
                assert_eq!(limit, None);
                assert!(!json);
                assert!(!snippets);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli =
            Cli::try_parse_from(["quarry", "merge", "1", "2", "--profile", "offline", "-v"]).unwrap();
        assert_eq!(cli.profile.as_deref(), Some("offline"));
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Merge { a: 1, b: 2 }));
    }
}
