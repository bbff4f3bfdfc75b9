//! Binary entry point for graph-retriever.
//!
//! This binary hosts the retrieval pipeline from the command line, either for
//! one-shot queries or as a line-delimited JSON service over stdio.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow needless_pass_by_value for command functions
#![allow(clippy::needless_pass_by_value)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

use anyhow::Context;
use clap::{Parser, Subcommand};
use graph_retriever::observability::{self, InitOptions};
use graph_retriever::storage::graph::{ArangoConnection, InMemoryGraphStore};
use graph_retriever::storage::traits::GraphStore;
use graph_retriever::{Pipeline, PipelineRequest, RetrieverConfig};
use serde_json::json;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;

/// Graph Retriever - keyword retrieval with graph expansion over `ArangoDB`.
#[derive(Parser)]
#[command(name = "graph-retriever")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Graph store: `arangodb` (default) or `memory:<snapshot.json>`.
    #[arg(long, global = true, env = "GRAPH_RETRIEVER_STORE", default_value = "arangodb")]
    store: StoreSpec,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Answer one user message with joined graph context.
    Ask {
        /// The user message.
        message: String,
    },

    /// Print the retrieved records for a query.
    Retrieve {
        /// The search query.
        query: String,

        /// Override the configured hop depth.
        #[arg(long)]
        hop: Option<u32>,

        /// Emit one JSON object per record.
        #[arg(long)]
        json: bool,
    },

    /// Serve line-delimited JSON pipeline requests over stdio.
    Serve,

    /// Check connectivity to the graph store.
    Ping,

    /// Manage configuration.
    Config {
        /// Show current configuration.
        #[arg(long)]
        show: bool,
    },
}

/// Which graph store backs the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
enum StoreSpec {
    /// Remote `ArangoDB` from configuration.
    Arango,
    /// In-memory store loaded from a snapshot file.
    Memory(PathBuf),
}

impl FromStr for StoreSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("arangodb") || s.eq_ignore_ascii_case("arango") {
            return Ok(Self::Arango);
        }
        match s.strip_prefix("memory:") {
            Some(path) if !path.is_empty() => Ok(Self::Memory(PathBuf::from(path))),
            _ => Err(format!(
                "unknown store '{s}': expected 'arangodb' or 'memory:<path>'"
            )),
        }
    }
}

/// Main entry point.
fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let config = match RetrieverConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        },
    };

    let expose_metrics = matches!(cli.command, Commands::Serve);
    let _observability = match observability::init(
        &config.logging,
        &config.metrics,
        InitOptions {
            verbose: cli.verbose,
            metrics_expose: expose_metrics,
        },
    ) {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("Failed to initialize observability: {e}");
            return ExitCode::FAILURE;
        },
    };

    match run_command(cli, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        },
    }
}

/// Runs the selected command.
fn run_command(cli: Cli, config: RetrieverConfig) -> anyhow::Result<()> {
    match cli.command {
        Commands::Ask { message } => cmd_ask(config, &cli.store, &message),
        Commands::Retrieve { query, hop, json } => {
            cmd_retrieve(config, &cli.store, &query, hop, json)
        },
        Commands::Serve => cmd_serve(config, &cli.store),
        Commands::Ping => cmd_ping(&config, &cli.store),
        Commands::Config { show } => {
            cmd_config(&config, show);
            Ok(())
        },
    }
}

/// Builds a pipeline over the selected store.
fn build_pipeline(config: RetrieverConfig, store: &StoreSpec) -> Pipeline {
    match store {
        StoreSpec::Arango => Pipeline::new(config),
        StoreSpec::Memory(path) => {
            let path = path.clone();
            Pipeline::with_connector(
                config,
                Box::new(move |_: &RetrieverConfig| -> graph_retriever::Result<Box<dyn GraphStore>> {
                    Ok(Box::new(InMemoryGraphStore::load_file(&path)?))
                }),
            )
        },
    }
}

fn cmd_ask(config: RetrieverConfig, store: &StoreSpec, message: &str) -> anyhow::Result<()> {
    let mut pipeline = build_pipeline(config, store);
    pipeline.on_startup().context("startup failed")?;
    let output = pipeline.handle_message(message, "", &[], &serde_json::Value::Null);
    pipeline.on_shutdown()?;

    println!("{}", output?);
    Ok(())
}

fn cmd_retrieve(
    config: RetrieverConfig,
    store: &StoreSpec,
    query: &str,
    hop: Option<u32>,
    json: bool,
) -> anyhow::Result<()> {
    let mut pipeline = build_pipeline(config, store);
    pipeline.on_startup().context("startup failed")?;

    let mut retrieval = pipeline.retrieval_config();
    if let Some(hop) = hop {
        retrieval = retrieval.with_hop(hop);
    }
    let records = pipeline.retrieve_with(query, retrieval);
    pipeline.on_shutdown()?;
    let records = records?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if json {
        for record in &records {
            serde_json::to_writer(&mut out, record)?;
            writeln!(out)?;
        }
    } else {
        for (index, record) in records.iter().enumerate() {
            writeln!(out, "{:>3}. [{}] {}", index + 1, record.id, record.text)?;
        }
        if records.is_empty() {
            writeln!(out, "No records found.")?;
        }
    }
    Ok(())
}

/// Reads one `PipelineRequest` per line and answers with one JSON line.
///
/// Failed requests are answered with `{"error": ...}`; the loop ends at EOF.
fn cmd_serve(config: RetrieverConfig, store: &StoreSpec) -> anyhow::Result<()> {
    let mut pipeline = build_pipeline(config, store);
    pipeline.on_startup().context("startup failed")?;
    tracing::info!("Serving pipeline requests on stdio");

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let mut served = 0_u64;

    for line in stdin.lock().lines() {
        let line = line.context("failed to read request")?;
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<PipelineRequest>(&line) {
            Ok(request) => match pipeline.handle_request(&request) {
                Ok(output) => json!({ "output": output }),
                Err(e) => json!({ "error": e.to_string() }),
            },
            Err(e) => json!({ "error": format!("invalid request: {e}") }),
        };

        serde_json::to_writer(&mut out, &response)?;
        writeln!(out)?;
        out.flush()?;
        served += 1;
    }

    tracing::info!(served, "Input closed, shutting down");
    pipeline.on_shutdown()?;
    Ok(())
}

fn cmd_ping(config: &RetrieverConfig, store: &StoreSpec) -> anyhow::Result<()> {
    match store {
        StoreSpec::Arango => {
            let connection = ArangoConnection::connect(&config.arangodb)?;
            println!(
                "Connected to {} (database '{}', ArangoDB {})",
                connection.endpoint(),
                connection.database(),
                connection.server_version()
            );
            connection.close();
        },
        StoreSpec::Memory(path) => {
            let graph = load_snapshot(path)?;
            println!(
                "Loaded {} ({} nodes, {} edges)",
                path.display(),
                graph.node_count(),
                graph.edge_count()
            );
        },
    }
    Ok(())
}

fn load_snapshot(path: &Path) -> anyhow::Result<InMemoryGraphStore> {
    InMemoryGraphStore::load_file(path)
        .with_context(|| format!("failed to load snapshot {}", path.display()))
}

fn cmd_config(config: &RetrieverConfig, show: bool) {
    if show {
        print!("{}", config.to_redacted_toml());
    } else {
        println!("Use --show to display configuration");
    }
}
