use std::env;
use std::path::PathBuf;

use ledgerseed_core::{MemoryStore, banking_schema};
use ledgerseed_generate::{GenerateOptions, GenerationEngine, RowTargets, export_all};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut args = env::args().skip(1);
    let mut out_dir = PathBuf::from("exports");
    let mut options = GenerateOptions::default();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--out" => out_dir = args.next().map(PathBuf::from).ok_or("missing --out path")?,
            "--seed" => options.seed = args.next().ok_or("missing --seed value")?.parse()?,
            "--rows" => {
                let rows = args.next().ok_or("missing --rows value")?.parse()?;
                options.targets = RowTargets::uniform(rows);
            }
            _ => return Err(format!("unexpected argument: {arg}").into()),
        }
    }

    let schema = banking_schema();
    let mut store = MemoryStore::new(schema.clone());
    let report = GenerationEngine::new(options).run(&schema, &mut store)?;
    let counts = export_all(&schema, &store, &out_dir)?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    println!("exported {} tables to {}", counts.len(), out_dir.display());
    Ok(())
}
