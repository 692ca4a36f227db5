//! Design-by-contract tooling CLI.
//!
//! Provides the `dbc` binary for inspecting contracts outside a host
//! loader: parse a structure's annotations, resolve the enforcement policy
//! for a directory, weave a structure and print its cache key, or evaluate
//! a single constraint expression.
//!
//! Structure metadata and enforcement configuration are read as JSON. When
//! `--config` is omitted, the path in `DBC_CONFIG` is used, and failing that
//! the default configuration.

use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use indexmap::IndexMap;
use serde_json::json;

use dbc_check::{evaluate, parse_descriptor, EvaluationScope};
use dbc_core::{
    Constraint, ConstraintScope, EnforcementConfig, Environment, MemberSnapshot, SourceLocation,
    StructureId, StructureMetadata, Value,
};
use dbc_storage::SqliteArtifactStore;
use dbc_weave::{resolve_policy, ContractEngine};

/// Design-by-contract tools.
#[derive(Parser)]
#[command(name = "dbc", about = "Design-by-contract tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Parse a structure's annotations and print its contract descriptor.
    Inspect {
        /// Path to the structure metadata JSON file.
        metadata: PathBuf,
    },

    /// Print the policy resolved for a directory.
    Policy {
        /// Path to the enforcement config JSON file.
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Directory the structure is loaded from.
        #[arg(short, long)]
        dir: PathBuf,
    },

    /// Weave a structure and print its cache key and plan summary.
    Key {
        /// Path to the structure metadata JSON file.
        metadata: PathBuf,

        /// Path to the enforcement config JSON file.
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Directory the structure is loaded from.
        #[arg(short, long)]
        dir: PathBuf,

        /// Artifact database to read and warm.
        #[arg(long)]
        db: Option<String>,
    },

    /// Evaluate one constraint expression.
    Eval {
        /// The expression, e.g. `balance >= amount`.
        expression: String,

        /// JSON object of parameter bindings.
        #[arg(short, long)]
        bindings: Option<String>,

        /// JSON object of `this` members.
        #[arg(long)]
        this: Option<String>,

        /// JSON value bound to `result`.
        #[arg(long)]
        result: Option<String>,
    },
}

fn main() {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();

    let exit_code = match cli.command {
        Commands::Inspect { metadata } => run_inspect(&metadata),
        Commands::Policy { config, dir } => run_policy(config.as_deref(), &dir),
        Commands::Key {
            metadata,
            config,
            dir,
            db,
        } => run_key(&metadata, config.as_deref(), &dir, db.as_deref()),
        Commands::Eval {
            expression,
            bindings,
            this,
            result,
        } => run_eval(&expression, bindings.as_deref(), this.as_deref(), result.as_deref()),
    };
    process::exit(exit_code);
}

/// Execute the inspect subcommand.
///
/// Returns exit code: 0 = success, 1 = unreadable or malformed contracts.
fn run_inspect(metadata_path: &Path) -> i32 {
    let metadata = match read_metadata(metadata_path) {
        Ok(m) => m,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return 1;
        }
    };
    match parse_descriptor(&metadata) {
        Ok(descriptor) => print_json(&descriptor),
        Err(e) => {
            eprintln!("Error: malformed contract: {}", e);
            1
        }
    }
}

/// Execute the policy subcommand.
fn run_policy(config_path: Option<&Path>, dir: &Path) -> i32 {
    match load_config(config_path) {
        Ok(config) => print_json(&resolve_policy(&config, dir)),
        Err(msg) => {
            eprintln!("Error: {}", msg);
            1
        }
    }
}

/// Execute the key subcommand.
///
/// Weaves as production would, so `--db` both reads a persisted plan and
/// stores a freshly woven one.
fn run_key(metadata_path: &Path, config_path: Option<&Path>, dir: &Path, db: Option<&str>) -> i32 {
    let (metadata, config) = match read_metadata(metadata_path).and_then(|m| Ok((m, load_config(config_path)?))) {
        Ok(pair) => pair,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return 1;
        }
    };

    let mut engine = ContractEngine::new(config.with_environment(Environment::Production));
    if let Some(db_path) = db {
        match SqliteArtifactStore::new(db_path) {
            Ok(store) => engine = engine.with_store(Arc::new(store)),
            Err(e) => {
                eprintln!("Error: failed to open artifact database '{}': {}", db_path, e);
                return 1;
            }
        }
    }

    let plan = match engine.plan_for(&metadata, dir) {
        Ok(plan) => plan,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    tracing::debug!(key = %plan.key, stats = ?engine.cache_stats(), "plan ready");

    print_json(&json!({
        "key": plan.key,
        "policy": plan.policy,
        "invariants": plan.invariants.len(),
        "methods": plan.methods.keys().collect::<Vec<_>>(),
        "properties": plan.properties.keys().collect::<Vec<_>>(),
        "cache": engine.cache_stats(),
    }))
}

/// Execute the eval subcommand.
///
/// Returns exit code: 0 = evaluated (the boolean is printed), 1 = bad
/// input, 2 = the expression could not be evaluated.
fn run_eval(expression: &str, bindings: Option<&str>, this: Option<&str>, result: Option<&str>) -> i32 {
    let inputs = parse_object(bindings, "--bindings")
        .and_then(|b| Ok((b, parse_object(this, "--this")?)))
        .and_then(|(b, t)| Ok((b, t, parse_value(result, "--result")?)));
    let (bindings, members, result) = match inputs {
        Ok(inputs) => inputs,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return 1;
        }
    };

    let snapshot = MemberSnapshot::new(members);
    let mut scope = EvaluationScope::for_structure(&snapshot);
    scope.bindings = bindings;
    scope.result = result;

    let constraint = Constraint::new(
        expression,
        ConstraintScope::Method,
        SourceLocation::structure(StructureId::from("<cli>"), 1),
    );
    match evaluate(&constraint, &scope) {
        Ok(holds) => print_json(&json!(holds)),
        Err(e) => {
            eprintln!("Error: {}", e);
            2
        }
    }
}

fn read_metadata(path: &Path) -> Result<StructureMetadata, String> {
    let text = fs::read_to_string(path).map_err(|e| format!("failed to read '{}': {}", path.display(), e))?;
    serde_json::from_str(&text).map_err(|e| format!("invalid metadata in '{}': {}", path.display(), e))
}

/// Loads the config from `path`, else from `DBC_CONFIG`, else defaults.
fn load_config(path: Option<&Path>) -> Result<EnforcementConfig, String> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => match std::env::var_os("DBC_CONFIG") {
            Some(p) => PathBuf::from(p),
            None => return Ok(EnforcementConfig::default()),
        },
    };
    let text = fs::read_to_string(&path).map_err(|e| format!("failed to read '{}': {}", path.display(), e))?;
    serde_json::from_str(&text).map_err(|e| format!("invalid config in '{}': {}", path.display(), e))
}

fn parse_object(text: Option<&str>, flag: &str) -> Result<IndexMap<String, Value>, String> {
    let Some(text) = text else {
        return Ok(IndexMap::new());
    };
    match serde_json::from_str::<serde_json::Value>(text) {
        Ok(serde_json::Value::Object(map)) => Ok(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect()),
        Ok(_) => Err(format!("{} must be a JSON object", flag)),
        Err(e) => Err(format!("invalid JSON for {}: {}", flag, e)),
    }
}

fn parse_value(text: Option<&str>, flag: &str) -> Result<Option<Value>, String> {
    text.map(|t| {
        serde_json::from_str::<serde_json::Value>(t)
            .map(Value::from)
            .map_err(|e| format!("invalid JSON for {}: {}", flag, e))
    })
    .transpose()
}

/// Prints pretty JSON to stdout and returns exit code 0.
fn print_json<T: serde::Serialize>(value: &T) -> i32 {
    let json = serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize result: {}\"}}", e));
    println!("{}", json);
    0
}
