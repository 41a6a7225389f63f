use crate::cli::{CacheArgs, CacheCommands, RunArgs};
use crate::commands::run::{connect, open_cache, prepare};
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use molbench::core::chem::SmilesSyntaxValidator;
use molbench::engine::cache::{DiskCache, ResultCache};
use molbench::engine::context::BenchmarkContext;
use molbench::engine::error::EngineError;
use molbench::engine::inference::CachedInference;
use molbench::engine::progress::ProgressReporter;
use molbench::workflows;
use std::path::Path;
use tracing::info;

pub fn run(args: CacheArgs) -> Result<()> {
    match args.command {
        CacheCommands::Warm(run_args) => handle_warm(run_args),
        CacheCommands::Info { path } => handle_info(&path),
    }
}

fn handle_warm(args: RunArgs) -> Result<()> {
    let validator = SmilesSyntaxValidator::default();
    let (config, plan) = prepare(&args, &validator)?;
    let cache = open_cache(&config)?;
    let before = cache.stats();

    let client = connect(&config)?;
    let inference = CachedInference::new(&client, &cache).map_err(EngineError::from)?;
    info!(model = %inference.model(), "Resolved model identity.");

    let backend = config.backend.build().map_err(EngineError::from)?;
    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());
    let context = BenchmarkContext::new(&inference, &validator, backend.as_ref(), &reporter);

    println!(
        "Warming cache for {} metric(s) on {} dataset(s)...",
        plan.jobs.len(),
        plan.datasets.len()
    );
    let summary = workflows::warm::run(&context, &plan)?;

    let after = cache.stats();
    println!("Cache: {}", cache.path().display());
    println!(
        "  Samples:    {} requested, {} newly cached",
        summary.samples,
        after.samples.saturating_sub(before.samples)
    );
    println!(
        "  Embeddings: {} requested, {} newly cached",
        summary.embeddings,
        after.embeddings.saturating_sub(before.embeddings)
    );
    Ok(())
}

fn handle_info(path: &Path) -> Result<()> {
    if !path.is_dir() {
        return Err(CliError::Argument(format!(
            "Cache directory does not exist: {}",
            path.display()
        )));
    }
    info!("Opening cache in {:?}", path);
    let cache = DiskCache::open(path).map_err(EngineError::from)?;
    let stats = cache.stats();
    println!("Cache: {}", cache.path().display());
    println!("  Samples:    {}", stats.samples);
    println!("  Embeddings: {}", stats.embeddings);
    Ok(())
}
