mod config;
mod registry;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use ledgerseed_core::{
    DatabaseSchema, Error as CoreError, MemoryStore, banking_schema, validate_schema,
};
use ledgerseed_eval::{EvalError, ValidationEngine, ValidationReport};
use ledgerseed_generate::{
    GenerateOptions, GenerationEngine, GenerationError, GenerationReport, export_all,
};
use thiserror::Error;
use uuid::Uuid;

use config::{FileConfig, RunSettings, TargetOverrides, load_config};
use registry::{RunContext, init_run_logging, start_run, write_generation};

#[derive(Debug, Error)]
enum CliError {
    #[error("registry error: {0}")]
    Registry(#[from] registry::RegistryError),
    #[error("schema error: {0}")]
    Core(#[from] CoreError),
    #[error("generation error: {0}")]
    Generation(#[from] GenerationError),
    #[error("validation error: {0}")]
    Eval(#[from] EvalError),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("config file error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "ledgerseed", version, about = "Seeded synthetic data for relational schemas")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate, enforce, export and validate a dataset.
    Run(RunArgs),
    /// Print the parents-first insertion order.
    Order(SchemaSource),
    /// Print the built-in schema, or the JSON Schema of schema files.
    Schema(SchemaArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// TOML settings file.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Seed for the run-wide random generator.
    #[arg(long, env = "RANDOM_SEED")]
    seed: Option<u64>,
    #[arg(long, env = "NUM_BRANCHES")]
    branches: Option<usize>,
    #[arg(long, env = "NUM_CUSTOMERS")]
    customers: Option<usize>,
    #[arg(long, env = "NUM_EMPLOYEES")]
    employees: Option<usize>,
    #[arg(long, env = "NUM_ACCOUNTS")]
    accounts: Option<usize>,
    /// Anchor date for relative dates (defaults to the current UTC date).
    #[arg(long, value_name = "YYYY-MM-DD")]
    today: Option<NaiveDate>,
    #[command(flatten)]
    source: SchemaSource,
    /// Output directory for runs.
    #[arg(long, default_value = "runs")]
    run_dir: PathBuf,
    /// Fingerprint of an earlier run to reproduce.
    #[arg(long, value_name = "SHA256")]
    expect_fingerprint: Option<String>,
    /// Exit with an error when any validation check fails.
    #[arg(long)]
    strict: bool,
}

impl RunArgs {
    fn overrides(&self) -> FileConfig {
        FileConfig {
            seed: self.seed,
            today: self.today,
            schema: self.source.schema.clone(),
            expected_fingerprint: self.expect_fingerprint.clone(),
            strict: self.strict.then_some(true),
            targets: TargetOverrides {
                branches: self.branches,
                customers: self.customers,
                employees: self.employees,
                accounts: self.accounts,
            },
        }
    }
}

#[derive(Args, Debug)]
struct SchemaSource {
    /// JSON schema file (defaults to the built-in banking schema).
    #[arg(long, value_name = "FILE")]
    schema: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct SchemaArgs {
    /// Emit the JSON Schema describing schema files instead.
    #[arg(long)]
    json_schema: bool,
    /// Write to a file instead of stdout.
    #[arg(long, value_name = "FILE")]
    out: Option<PathBuf>,
}

fn main() -> Result<(), CliError> {
    let cli = Cli::parse();

    match cli.command {
        Command::Run(args) => run_generate(args),
        Command::Order(source) => print_order(&source),
        Command::Schema(args) => print_schema(&args),
    }
}

fn load_schema(path: Option<&Path>) -> Result<DatabaseSchema, CliError> {
    let schema = match path {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => banking_schema(),
    };
    validate_schema(&schema)?;
    Ok(schema)
}

fn run_generate(args: RunArgs) -> Result<(), CliError> {
    let file = match &args.config {
        Some(path) => load_config(path)?,
        None => FileConfig::default(),
    };
    let settings = RunSettings::resolve(args.overrides(), file)?;
    let schema = load_schema(settings.schema.as_deref())?;

    let run_ctx = RunContext {
        run_id: Uuid::new_v4().to_string(),
        started_at: chrono::Utc::now(),
        run_dir: args.run_dir,
        settings: settings.clone(),
    };
    let run_paths = start_run(&run_ctx)?;
    init_run_logging(&run_paths.logs_path)?;

    tracing::info!(event = "run_started", run_id = %run_ctx.run_id, seed = settings.seed);
    let timer = Instant::now();

    let mut store = MemoryStore::new(schema.clone());
    let generation = GenerationEngine::new(settings.generate_options()).run(&schema, &mut store)?;
    write_generation(&run_paths, &generation)?;
    tracing::info!(event = "generation_written", path = %run_paths.generation_path.display());

    let exported = export_all(&schema, &store, &run_paths.exports_dir)?;
    tracing::info!(
        event = "exports_written",
        tables = exported.len(),
        path = %run_paths.exports_dir.display()
    );

    let engine = ValidationEngine::new(settings.validate_options(generation.today));
    let report = engine.run(&schema, &store)?;
    print_summary(&generation, &report, &exported, &run_paths.root);
    let written = engine.write_report(&report, &run_paths.root);

    let status = if written.is_ok() { "success" } else { "failed" };
    let duration_ms = timer.elapsed().as_millis();
    tracing::info!(event = "run_finished", status = status, duration_ms = duration_ms);

    written?;
    Ok(())
}

fn print_summary(
    generation: &GenerationReport,
    report: &ValidationReport,
    exported: &BTreeMap<String, u64>,
    run_root: &Path,
) {
    println!("insertion order: {}", generation.insertion_order.join(" -> "));
    for (table, rows) in exported {
        println!("  {table}: {rows} rows");
    }
    println!("total rows: {}", exported.values().sum::<u64>());
    println!(
        "validation: {} passed, {} failed",
        report.passed, report.failed
    );
    for finding in report.failures() {
        println!("  FAIL {} - {}: {}", finding.category, finding.rule, finding.detail);
    }
    if let Some(fingerprint) = &report.fingerprint {
        println!("fingerprint: {fingerprint}");
    }
    println!("run directory: {}", run_root.display());
}

fn print_order(source: &SchemaSource) -> Result<(), CliError> {
    let schema = load_schema(source.schema.as_deref())?;
    let graph = GenerationEngine::new(GenerateOptions::default()).dependency_graph(&schema);
    for (position, table) in graph.insertion_order()?.iter().enumerate() {
        println!("{:>2}. {table}", position + 1);
    }
    for edge in graph.deferred_edges() {
        println!(
            "deferred: {}.{} -> {}.{}",
            edge.table, edge.column, edge.referenced_table, edge.referenced_column
        );
    }
    Ok(())
}

fn print_schema(args: &SchemaArgs) -> Result<(), CliError> {
    let rendered = if args.json_schema {
        serde_json::to_string_pretty(&schemars::schema_for!(DatabaseSchema))?
    } else {
        serde_json::to_string_pretty(&banking_schema())?
    };
    match &args.out {
        Some(path) => std::fs::write(path, rendered)?,
        None => println!("{rendered}"),
    }
    Ok(())
}
