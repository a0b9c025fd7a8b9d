use std::env;
use std::path::PathBuf;

use ledgerseed_core::{MemoryStore, banking_schema};
use ledgerseed_eval::{ValidateOptions, ValidationEngine};
use ledgerseed_generate::{GenerateOptions, GenerationEngine, RowTargets};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = env::args().skip(1);
    let mut rows = 50;
    let mut out_dir: Option<PathBuf> = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--rows" => rows = args.next().ok_or("missing --rows value")?.parse()?,
            "--out" => out_dir = args.next().map(PathBuf::from),
            _ => return Err(format!("unexpected argument: {arg}").into()),
        }
    }
    let out_dir = out_dir.ok_or("missing --out directory")?;

    let schema = banking_schema();
    let mut store = MemoryStore::new(schema.clone());
    GenerationEngine::new(GenerateOptions {
        targets: RowTargets::uniform(rows),
        ..GenerateOptions::default()
    })
    .run(&schema, &mut store)?;

    let engine = ValidationEngine::new(ValidateOptions::default());
    let report = engine.run(&schema, &store)?;
    let paths = engine.write_report(&report, &out_dir)?;

    println!("passed={} failed={}", report.passed, report.failed);
    println!("report_path={}", paths.report_path.display());
    println!("findings_path={}", paths.findings_path.display());
    Ok(())
}
