//! rdfsync command-line client.
//!
//! Provides the `rdfsync` binary: load an entity as a JSON document, or
//! record a single mutation and flush it through the reconciliation engine.
//! The store is a SPARQL endpoint (`--endpoint`), a SQLite database (`--db`),
//! or whatever the `RDFSYNC_*` environment variables configure.
//!
//! Exit codes: 0 = success, 1 = invalid input or configuration,
//! 2 = entity deletion blocked by references, 3 = store failure.

use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use rdfsync_core::ReconcilePolicy;
use rdfsync_engine::{ApplyStrategy, EngineConfig, EngineError, FlushError, Session};
use rdfsync_storage::{SparqlHttpStore, SqliteStore, TripleStore};

/// Reconcile and inspect entities in a triple store.
#[derive(Parser)]
#[command(name = "rdfsync", about = "Reconcile and inspect entities in a triple store")]
struct Cli {
    /// SPARQL query endpoint URL.
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// SPARQL update endpoint URL (default: the query endpoint).
    #[arg(long, global = true)]
    update_endpoint: Option<String>,

    /// Bearer token sent to the SPARQL endpoint.
    #[arg(long, global = true)]
    auth_token: Option<String>,

    /// Path to a SQLite statement database.
    #[arg(long, global = true)]
    db: Option<String>,

    /// Apply strategy: atomic-combined or two-phase.
    #[arg(long, global = true)]
    strategy: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Print an entity as a JSON document.
    Get {
        /// Entity IRI.
        id: String,

        /// Expand referenced entities into nested documents.
        #[arg(long)]
        deep: bool,
    },

    /// Save a value at (id, predicate).
    Set {
        id: String,
        predicate: String,
        value: String,

        /// Datatype IRI for a typed literal.
        #[arg(long, conflicts_with_all = ["lang", "iri"])]
        datatype: Option<String>,

        /// Language tag for a language-tagged string.
        #[arg(long, conflicts_with = "iri")]
        lang: Option<String>,

        /// Treat the value as a resource IRI instead of a literal.
        #[arg(long)]
        iri: bool,

        /// Reconcile policy: replace-all, replace-if-different, append-if-absent.
        #[arg(long, default_value = "replace-all")]
        policy: String,
    },

    /// Remove every value at (id, predicate).
    Unset { id: String, predicate: String },

    /// Remove an entity. Refused while other entities reference it.
    Delete { id: String },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let exit_code = run(cli).await;
    process::exit(exit_code);
}

async fn run(cli: Cli) -> i32 {
    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return 1;
        }
    };
    let store = match open_store(&cli, &config) {
        Ok(store) => store,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return 3;
        }
    };
    let session = Session::new(store, &config);

    match cli.command {
        Commands::Get { id, deep } => run_get(&session, &id, deep).await,
        Commands::Set {
            id,
            predicate,
            value,
            datatype,
            lang,
            iri,
            policy,
        } => {
            let policy = match parse_policy(&policy) {
                Ok(policy) => policy,
                Err(msg) => {
                    eprintln!("Error: {}", msg);
                    return 1;
                }
            };
            let recorded = if iri {
                session.record_link(&id, &predicate, &value, policy)
            } else if let Some(lang) = lang {
                session.record_save_lang(&id, &predicate, &value, &lang, policy)
            } else {
                session.record_save(&id, &predicate, &value, datatype.as_deref(), policy)
            };
            run_flush(&session, recorded).await
        }
        Commands::Unset { id, predicate } => {
            let recorded = session.record_delete(&id, &predicate, ReconcilePolicy::DeleteKey);
            run_flush(&session, recorded).await
        }
        Commands::Delete { id } => {
            let recorded = session.record_delete_entity(&id);
            run_flush(&session, recorded).await
        }
    }
}

/// Merges command-line flags over the environment configuration.
fn load_config(cli: &Cli) -> Result<EngineConfig, String> {
    let mut config = EngineConfig::from_env().map_err(|e| e.to_string())?;
    if cli.endpoint.is_some() || cli.db.is_some() {
        config.endpoint = cli.endpoint.clone();
        config.db_path = cli.db.clone();
    }
    if let Some(update) = &cli.update_endpoint {
        config.update_endpoint = Some(update.clone());
    }
    if let Some(strategy) = &cli.strategy {
        config.apply_strategy = strategy
            .parse::<ApplyStrategy>()
            .map_err(|e| e.to_string())?;
    }
    Ok(config)
}

/// Opens the configured backend. An endpoint wins over a database path.
fn open_store(cli: &Cli, config: &EngineConfig) -> Result<Arc<dyn TripleStore>, String> {
    if let Some(endpoint) = &config.endpoint {
        let mut store = SparqlHttpStore::new(endpoint.as_str())
            .with_timeout(Duration::from_millis(config.request_timeout_ms));
        if let Some(update) = &config.update_endpoint {
            store = store.with_update_endpoint(update.as_str());
        }
        if let Some(token) = &cli.auth_token {
            store = store.with_auth_token(token.as_str());
        }
        tracing::debug!(endpoint = %endpoint, "using sparql endpoint");
        return Ok(Arc::new(store));
    }
    if let Some(path) = &config.db_path {
        let store = SqliteStore::new(path)
            .map_err(|e| format!("failed to open database '{}': {}", path, e))?;
        return Ok(Arc::new(store));
    }
    Err(rdfsync_engine::ConfigError::NoStore.to_string())
}

async fn run_get(session: &Session<dyn TripleStore>, id: &str, deep: bool) -> i32 {
    match session.load(id, deep).await {
        Ok(Some(document)) => {
            print_json(&document);
            0
        }
        Ok(None) => {
            eprintln!("Error: no statements about '{}'", id);
            1
        }
        Err(err) => report_engine_error(&err),
    }
}

async fn run_flush(
    session: &Session<dyn TripleStore>,
    recorded: Result<rdfsync_core::OperationId, EngineError>,
) -> i32 {
    if let Err(err) = recorded {
        return report_engine_error(&err);
    }
    match session.flush(None).await {
        Ok(report) => {
            print_json(&report);
            0
        }
        Err(FlushError { source, .. }) => report_engine_error(&source),
    }
}

fn report_engine_error(err: &EngineError) -> i32 {
    match err {
        EngineError::Validation(e) => {
            eprintln!("Invalid input: {}", e);
            1
        }
        EngineError::ReferenceConflict { .. } => {
            eprintln!("Error: {}", err);
            2
        }
        EngineError::PartialApply(partial) => {
            eprintln!("Error: {}", partial);
            for statement in partial.uncertain() {
                eprintln!("  - uncertain: {}", statement);
            }
            3
        }
        EngineError::TransientStore(_) => {
            eprintln!("Error: {} (safe to retry)", err);
            3
        }
        EngineError::Store(_) => {
            eprintln!("Error: {}", err);
            3
        }
    }
}

/// Parse a reconcile policy name for `set`.
fn parse_policy(s: &str) -> Result<ReconcilePolicy, String> {
    match s {
        "replace-all" => Ok(ReconcilePolicy::ReplaceAll),
        "replace-if-different" => Ok(ReconcilePolicy::ReplaceIfDifferent),
        "append-if-absent" => Ok(ReconcilePolicy::AppendIfAbsent),
        _ => Err(format!(
            "invalid policy '{}', expected replace-all/replace-if-different/append-if-absent",
            s
        )),
    }
}

fn print_json(value: &impl serde::Serialize) {
    let json = serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize result: {}\"}}", e));
    println!("{}", json);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_policy() {
        assert_eq!(parse_policy("append-if-absent"), Ok(ReconcilePolicy::AppendIfAbsent));
        // delete-key is only reachable through `unset`.
        assert!(parse_policy("delete-key").is_err());
    }

    #[test]
    fn test_set_flags() {
        let cli = Cli::try_parse_from([
            "rdfsync",
            "--db",
            "store.db",
            "set",
            "http://example.org/e1",
            "http://example.org/age",
            "30",
            "--datatype",
            "http://www.w3.org/2001/XMLSchema#integer",
        ])
        .unwrap();
        assert_eq!(cli.db.as_deref(), Some("store.db"));
        assert!(matches!(cli.command, Commands::Set { iri: false, datatype: Some(_), .. }));

        let conflicting = Cli::try_parse_from([
            "rdfsync",
            "set",
            "http://example.org/e1",
            "http://example.org/p",
            "v",
            "--iri",
            "--lang",
            "en",
        ]);
        assert!(conflicting.is_err());
    }

    #[test]
    fn test_command_line_selects_store_over_environment() {
        let cli = Cli::try_parse_from([
            "rdfsync",
            "--endpoint",
            "http://localhost:7878/query",
            "get",
            "http://example.org/e1",
        ])
        .unwrap();
        let config = load_config(&cli).unwrap();
        assert_eq!(config.endpoint.as_deref(), Some("http://localhost:7878/query"));
        assert_eq!(config.db_path, None);
    }
}
