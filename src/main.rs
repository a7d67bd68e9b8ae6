use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use overlay_editor::config::{Config, LoggingConfig};
use overlay_editor::filter::FilterLevel;
use overlay_editor::overlay::{NodeId, OverlayTree};
use overlay_editor::search::SearchWorker;
use overlay_editor::session::Session;
use overlay_editor::store::{DocumentStore, MemoryStore};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "overlay-editor", version, about = "Prototype-inheritance document editor")]
struct Cli {
    /// Configuration file; defaults to ./overlay-editor.* when present.
    #[arg(long, env = "OVERLAY_EDITOR_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the visible tree of a document from a JSON store fixture.
    Show {
        #[arg(long)]
        store: PathBuf,
        #[arg(long)]
        doc: String,
        #[arg(long, value_enum)]
        level: Option<FilterLevel>,
    },
    /// Rank the fixture's document keys against a query.
    Search {
        #[arg(long)]
        store: PathBuf,
        query: String,
    },
    /// Print the effective configuration as TOML.
    Config,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    init_tracing(&config.logging);

    match cli.command {
        Command::Show { store, doc, level } => show(config, &store, &doc, level),
        Command::Search { store, query } => search(&config, &store, &query),
        Command::Config => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.filter));
    let registry = tracing_subscriber::registry().with(filter);
    if logging.json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

fn load_store(path: &Path) -> anyhow::Result<MemoryStore> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read store fixture {}", path.display()))?;
    MemoryStore::from_json(&json).with_context(|| format!("Invalid store fixture {}", path.display()))
}

fn show(config: Config, path: &Path, doc: &str, level: Option<FilterLevel>) -> anyhow::Result<()> {
    let store = load_store(path)?;
    let mut session = Session::new(store, config.session);
    if let Some(level) = level {
        session.set_level(level)?;
    }
    session.open(doc)?;

    tracing::info!(doc = %doc, level = %session.level(), "Showing document");
    if let Some(tree) = session.tree() {
        print_node(tree, tree.root(), 0);
    }
    Ok(())
}

fn search(config: &Config, path: &Path, query: &str) -> anyhow::Result<()> {
    let candidates = load_store(path)?.documents();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to create search runtime")?;

    let matches = runtime.block_on(async {
        let (mut worker, mut results) = SearchWorker::from_config(&config.search);
        worker.start(query, candidates).await;
        results.recv().await
    });

    let matches = matches.map(|r| r.matches).unwrap_or_default();
    tracing::info!(query = %query, matches = matches.len(), "Search finished");
    for key in matches {
        println!("{}", key);
    }
    Ok(())
}

fn print_node(tree: &OverlayTree, id: NodeId, depth: usize) {
    let Some(node) = tree.node(id) else {
        return;
    };
    let marker = if node.is_override() {
        "*"
    } else if node.top_layer {
        "+"
    } else {
        " "
    };
    println!("{}{} {}", "  ".repeat(depth), marker, node.label());

    for child in tree.visible_children(id) {
        print_node(tree, child, depth + 1);
    }
}
