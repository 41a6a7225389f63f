use crate::cli::RunArgs;
use crate::config::{AppConfig, PartialBenchmarkConfig};
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use molbench::core::chem::SmilesSyntaxValidator;
use molbench::core::io::sink::{CsvSink, JsonLinesSink, RecordSink};
use molbench::core::io::{dataset, training};
use molbench::core::models::record::MetricRecord;
use molbench::core::models::training::SmilesSet;
use molbench::engine::cache::DiskCache;
use molbench::engine::config::{BenchmarkPlan, BenchmarkPlanBuilder};
use molbench::engine::context::BenchmarkContext;
use molbench::engine::error::EngineError;
use molbench::engine::inference::CachedInference;
use molbench::engine::inference::grpc::GrpcClient;
use molbench::engine::progress::ProgressReporter;
use molbench::workflows;
use tracing::info;

pub fn run(args: RunArgs) -> Result<()> {
    let validator = SmilesSyntaxValidator::default();
    let (config, plan) = prepare(&args, &validator)?;
    let training_set = load_training_set(&config)?;

    let cache = open_cache(&config)?;
    let client = connect(&config)?;
    let inference = CachedInference::new(&client, &cache).map_err(EngineError::from)?;
    info!(model = %inference.model(), "Resolved model identity.");

    let backend = config.backend.build().map_err(EngineError::from)?;
    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());
    let mut context = BenchmarkContext::new(&inference, &validator, backend.as_ref(), &reporter);
    if let Some(set) = &training_set {
        context = context.with_training_set(set);
    }

    let mut metrics_sink = CsvSink::open(config.metrics_path()).map_err(EngineError::from)?;
    let mut predictions_sink = if config.retains_predictions() {
        Some(JsonLinesSink::open(config.predictions_path()).map_err(EngineError::from)?)
    } else {
        None
    };

    println!(
        "Running {} metric(s) on {} dataset(s) with the {} backend...",
        plan.jobs.len(),
        plan.datasets.len(),
        config.backend
    );
    let records = workflows::benchmark::run(
        &context,
        &plan,
        &mut metrics_sink,
        predictions_sink
            .as_mut()
            .map(|sink| sink as &mut dyn RecordSink),
    )?;

    print_summary(&records);
    println!("Results appended to: {}", metrics_sink.path().display());
    if predictions_sink.is_some() {
        println!(
            "Predictions appended to: {}",
            config.predictions_path().display()
        );
    }
    Ok(())
}

/// Resolves the configuration and loads every dataset an enabled metric uses.
pub(crate) fn prepare(
    args: &RunArgs,
    validator: &SmilesSyntaxValidator,
) -> Result<(AppConfig, BenchmarkPlan)> {
    let partial_config = PartialBenchmarkConfig::from_file(&args.config)?;
    info!("Merging configuration from file and CLI arguments...");
    let config = partial_config.merge_with_cli(args)?;
    let plan = build_plan(&config, validator)?;
    Ok((config, plan))
}

fn load_training_set(config: &AppConfig) -> Result<Option<SmilesSet>> {
    let Some(settings) = &config.training_set else {
        return Ok(None);
    };
    training::read_from_path(&settings.path, settings.smiles_column.as_deref())
        .map(Some)
        .map_err(|e| CliError::FileParsing {
            path: settings.path.clone(),
            source: e.into(),
        })
}

pub(crate) fn open_cache(config: &AppConfig) -> Result<DiskCache> {
    info!(path = %config.cache_dir.display(), "Opening result cache...");
    Ok(DiskCache::open(&config.cache_dir).map_err(EngineError::from)?)
}

pub(crate) fn connect(config: &AppConfig) -> Result<GrpcClient> {
    println!(
        "Connecting to {} at {}...",
        config.model.model, config.model.endpoint
    );
    let client = GrpcClient::connect(
        &config.model.endpoint,
        config.model.model,
        config.model.min_jitter_radius,
    )
    .map_err(EngineError::from)?;
    Ok(match &config.model.display_name {
        Some(name) => client.with_display_name(name.clone()),
        None => client,
    })
}

fn build_plan(config: &AppConfig, validator: &SmilesSyntaxValidator) -> Result<BenchmarkPlan> {
    let mut builder = BenchmarkPlanBuilder::new();
    for spec in &config.datasets {
        if !config.metrics.iter().any(|m| m.dataset == spec.name) {
            info!(dataset = %spec.name, "Skipping dataset no enabled metric uses.");
            continue;
        }
        let loaded = dataset::read_from_path(spec, validator).map_err(|e| CliError::FileParsing {
            path: spec.path.clone(),
            source: e.into(),
        })?;
        builder = builder.dataset(loaded);
    }
    for metric in &config.metrics {
        builder = builder.job(metric.spec.clone(), metric.dataset.clone());
    }
    builder.build().map_err(|e| CliError::Core(e.into()))
}

fn print_summary(records: &[MetricRecord]) {
    println!();
    println!("{:<30} {:<16} {}", "METRIC", "VALUE", "PARAMS");
    for record in records {
        println!(
            "{:<30} {:<16} {}",
            record.name,
            format!("{:.6}", record.value.as_scalar().unwrap_or(f64::NAN)),
            record.params_string()
        );
    }
    println!();
}
