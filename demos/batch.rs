use std::path::PathBuf;
use std::time::Instant;

use tts_batch::{
    clients::edge_cli::EdgeTtsCli,
    config::{AppConfig, DEFAULT_CONFIG_PATH},
    input::{plan_tasks, read_records},
    BatchEngine, OutcomeLedger,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let csv_path = PathBuf::from(args.next().unwrap_or_else(|| "input.csv".to_string()));
    let config_path = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

    let config = AppConfig::load_or_default(&config_path);
    let records = read_records(
        &csv_path,
        &config.text_column,
        &config.path_column,
        Some(config.max_records),
    )?;
    let plan = plan_tasks(&records, &config.output_dir);
    println!(
        "{} task(s) ready, {} row(s) skipped",
        plan.tasks.len(),
        plan.rejected.len()
    );

    let engine = BatchEngine::new(EdgeTtsCli::new(), config.engine_config()?);

    let start = Instant::now();
    let outcomes = engine.run_blocking(plan.tasks, config.tts.concurrent, |done, total, outcome| {
        let mark = if outcome.succeeded() { "ok" } else { "FAILED" };
        println!(
            "[{done}/{total}] {mark} {} {}",
            outcome.destination().display(),
            outcome.error()
        );
    })?;
    println!("Batch finished in {:.2?}", start.elapsed());

    let mut ledger = OutcomeLedger::new();
    ledger.extend(plan.rejected);
    ledger.extend(outcomes);
    ledger.write(&config.result_file)?;
    println!(
        "{} succeeded, {} failed, report saved to {}",
        ledger.succeeded(),
        ledger.failed(),
        config.result_file.display()
    );

    Ok(())
}
