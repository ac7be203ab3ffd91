use quarry::cli::{Cli, Commands, ConfigAction};
use quarry::config::{Config, ConfigValidator};
use quarry::corpus::read_documents;
use quarry::engine::SeedReport;
use quarry::error::{QuarryError, Result};
use quarry::rag::RagAnswer;
use quarry::segment::Document;
use quarry::SearchEngine;
use std::path::{Path, PathBuf};

fn main() -> Result<()> {
    let cli = Cli::parse_args();

    init_logging(cli.verbose);

    match cli.command {
        Commands::Seed { file } => {
            cmd_seed(cli.config, cli.profile, &file)?;
        }
        Commands::Add {
            url,
            title,
            content_file,
        } => {
            cmd_add(cli.config, cli.profile, url, title, &content_file)?;
        }
        Commands::Search {
            query,
            limit,
            json,
            snippets,
        } => {
            cmd_search(cli.config, cli.profile, &query, limit, json, snippets)?;
        }
        Commands::Merge { a, b } => {
            cmd_merge(cli.config, cli.profile, a, b)?;
        }
        Commands::Segments { json } => {
            cmd_segments(cli.config, cli.profile, json)?;
        }
        Commands::Stats => {
            cmd_stats(cli.config, cli.profile)?;
        }
        Commands::Embed => {
            cmd_embed(cli.config, cli.profile)?;
        }
        Commands::Ask { question, top_k } => {
            cmd_ask(cli.config, cli.profile, &question, top_k)?;
        }
        Commands::Config { action } => {
            cmd_config(cli.config, cli.profile, action)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose { "quarry=debug" } else { "quarry=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    fmt().with_env_filter(filter).with_target(false).init();
}

fn cmd_seed(config_path: Option<PathBuf>, profile: Option<String>, file: &Path) -> Result<()> {
    let config = load_config(config_path, profile)?;
    let documents = read_documents(file)?;

    if documents.is_empty() {
        println!("No documents in {}", file.display());
        return Ok(());
    }

    let mut engine = SearchEngine::open(&config)?;
    let report = engine.seed(&documents)?;
    print_seed_report(&report);

    Ok(())
}

fn cmd_add(
    config_path: Option<PathBuf>,
    profile: Option<String>,
    url: String,
    title: String,
    content_file: &Path,
) -> Result<()> {
    let config = load_config(config_path, profile)?;
    let content = std::fs::read_to_string(content_file).map_err(|e| QuarryError::Io {
        source: e,
        context: format!("Failed to read content file: {:?}", content_file),
    })?;

    let mut engine = SearchEngine::open(&config)?;
    let report = engine.seed(&[Document::new(url, title, content)])?;
    print_seed_report(&report);

    Ok(())
}

fn print_seed_report(report: &SeedReport) {
    match report.segment_id {
        Some(id) => {
            println!("✓ Created segment {}", id);
            println!("  Indexed: {}", report.indexed);
            println!("  Skipped: {}", report.skipped);
            println!("  Embedded: {}", report.embedded);
        }
        None => {
            println!(
                "Nothing new to index ({} documents already indexed)",
                report.skipped
            );
        }
    }
}

fn cmd_search(
    config_path: Option<PathBuf>,
    profile: Option<String>,
    query: &str,
    limit: Option<usize>,
    json: bool,
    snippets: bool,
) -> Result<()> {
    let config = load_config(config_path, profile)?;
    let limit = limit.unwrap_or(config.search.default_limit);
    let engine = SearchEngine::open(&config)?;

    let results = engine.search(query, limit)?;

    if json {
        let output = serde_json::to_string_pretty(&results).map_err(|e| QuarryError::Json {
            source: e,
            context: "Failed to serialize results".to_string(),
        })?;
        println!("{}", output);
        return Ok(());
    }

    if results.is_empty() {
        println!("No results for \"{}\"", query);
        return Ok(());
    }

    let terms = engine.query_terms(query);
    for (rank, result) in results.iter().enumerate() {
        println!("{}. {} ({:.4})", rank + 1, result.title, result.score);
        println!("   {}", result.url);

        match result.location {
            Some(location) => println!(
                "   segment {} / doc {}",
                location.segment_id, location.doc_id
            ),
            None => println!("   semantic match"),
        }

        if snippets {
            for snippet in engine.snippets(&terms, result)? {
                println!(
                    "   SNIPPET [{} #{}] ...{}...",
                    snippet.term, snippet.occurrence, snippet.text
                );
            }
        }
    }

    Ok(())
}

fn cmd_merge(config_path: Option<PathBuf>, profile: Option<String>, a: i64, b: i64) -> Result<()> {
    let config = load_config(config_path, profile)?;
    let mut engine = SearchEngine::open(&config)?;

    let report = engine.merge(a, b)?;

    println!(
        "✓ Merged segments {} and {} into {}",
        report.sources.0, report.sources.1, report.merged_id
    );
    println!("  Documents: {}", report.documents);
    println!("  Duplicates dropped: {}", report.duplicates_dropped);

    Ok(())
}

fn cmd_segments(config_path: Option<PathBuf>, profile: Option<String>, json: bool) -> Result<()> {
    let config = load_config(config_path, profile)?;
    let engine = SearchEngine::open(&config)?;
    let stats = engine.segment_stats();

    if json {
        let output = serde_json::to_string_pretty(&stats).map_err(|e| QuarryError::Json {
            source: e,
            context: "Failed to serialize segments".to_string(),
        })?;
        println!("{}", output);
        return Ok(());
    }

    if stats.is_empty() {
        println!("No live segments. Run 'quarry seed <FILE>' to create one.");
        return Ok(());
    }

    println!("{:>8}  {:>10}  {:>8}", "SEGMENT", "DOCUMENTS", "TERMS");
    for segment in &stats {
        println!(
            "{:>8}  {:>10}  {:>8}",
            segment.id, segment.documents, segment.terms
        );
    }

    Ok(())
}

fn cmd_stats(config_path: Option<PathBuf>, profile: Option<String>) -> Result<()> {
    let config = load_config(config_path, profile)?;
    let engine = SearchEngine::open(&config)?;
    let stats = engine.database_stats()?;

    println!("Quarry Status");
    println!("=============");
    println!("Database: {}", config.storage.database_path()?.display());
    println!("\nCanonical documents: {}", stats.canonical_document_count);
    println!("Active segments: {}", stats.active_segment_count);
    println!("Retired segments: {}", stats.retired_segment_count);
    println!("Terms: {}", stats.term_count);
    println!("Postings: {}", stats.posting_count);
    println!("Embeddings: {}", stats.embedding_count);
    println!(
        "Semantic search: {}",
        if engine.has_semantic_search() {
            "enabled"
        } else {
            "disabled"
        }
    );

    Ok(())
}

fn cmd_embed(config_path: Option<PathBuf>, profile: Option<String>) -> Result<()> {
    let config = load_config(config_path, profile)?;
    let engine = SearchEngine::open(&config)?;

    let embedded = engine.backfill_embeddings()?;
    println!("✓ Embedded {} documents", embedded);

    Ok(())
}

fn cmd_ask(
    config_path: Option<PathBuf>,
    profile: Option<String>,
    question: &str,
    top_k: Option<usize>,
) -> Result<()> {
    let mut config = load_config(config_path, profile)?;
    if let Some(top_k) = top_k {
        config.rag.top_k = top_k;
    }

    let engine = SearchEngine::open(&config)?;

    match engine.ask(question)? {
        RagAnswer::NoResults => {
            println!("No matching documents to answer from.");
        }
        RagAnswer::Answer { text, sources } => {
            println!("{}", text);
            println!("\nSources:");
            for source in &sources {
                println!(
                    "  [Doc {}] {} ({:.4})",
                    source.number, source.title, source.score
                );
                println!("          {}", source.url);
            }
        }
    }

    Ok(())
}

fn cmd_config(
    config_path: Option<PathBuf>,
    profile: Option<String>,
    action: ConfigAction,
) -> Result<()> {
    match action {
        ConfigAction::Show { section } => {
            let config = load_config(config_path, profile)?;
            let value = serde_json::to_value(&config).map_err(|e| QuarryError::Json {
                source: e,
                context: "Failed to serialize config".to_string(),
            })?;

            let value = match section {
                Some(section) => value.get(&section).cloned().ok_or_else(|| {
                    QuarryError::Config(format!("Unknown config section: {}", section))
                })?,
                None => value,
            };

            let json = serde_json::to_string_pretty(&value).map_err(|e| QuarryError::Json {
                source: e,
                context: "Failed to serialize config".to_string(),
            })?;
            println!("{}", json);
        }
        ConfigAction::Validate { file } => {
            let path = match file.or(config_path) {
                Some(path) => path,
                None => Config::default_path()?,
            };
            let config = Config::load(&path)?;
            println!("✓ Configuration is valid");
            println!("  Schema version: {}", config.meta.schema_version);
        }
        ConfigAction::Init { force } => {
            let path = match config_path {
                Some(path) => path,
                None => Config::default_path()?,
            };

            if path.exists() && !force {
                println!("Configuration file already exists at: {}", path.display());
                println!("Use --force to overwrite");
                return Ok(());
            }

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| QuarryError::Io {
                    source: e,
                    context: format!("Failed to create config directory: {:?}", parent),
                })?;
            }

            Config::default().save(&path)?;

            println!("✓ Configuration initialized at: {}", path.display());
        }
    }

    Ok(())
}

fn load_config(config_path: Option<PathBuf>, profile: Option<String>) -> Result<Config> {
    let path = match config_path {
        Some(path) => path,
        None => Config::default_path()?,
    };

    if !path.exists() {
        tracing::warn!(
            "Config file not found, using defaults. Run 'quarry config init' to create one."
        );
        let mut config = Config::default();
        config.apply_env_overrides();
        if let Some(profile) = profile {
            config.apply_profile(&profile)?;
        }
        ConfigValidator::validate(&config)?;
        return Ok(config);
    }

    if let Some(profile) = profile {
        Config::load_with_profile(&path, &profile)
    } else {
        Config::load(&path)
    }
}
