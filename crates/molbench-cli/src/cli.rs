use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    version,
    about = "MolBench CLI - Benchmark generative molecular models: sampling validity, uniqueness and novelty, embedding neighbourhood correlation and modelability.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of threads for parallel computation.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the configured metrics against a model server and append the results.
    Run(RunArgs),
    /// Inspect or pre-fill a durable result cache.
    Cache(CacheArgs),
}

/// Arguments for the `run` subcommand.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to the benchmark configuration file in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub config: PathBuf,

    // --- Model Overrides ---
    /// Override the model served at the endpoint (cddd, molbart, megamolbart).
    #[arg(short, long, value_name = "NAME")]
    pub model: Option<String>,

    /// Override the gRPC endpoint of the model server.
    #[arg(short, long, value_name = "URL")]
    pub endpoint: Option<String>,

    // --- Storage Overrides ---
    /// Override the durable cache directory.
    #[arg(long, value_name = "PATH")]
    pub cache_dir: Option<PathBuf>,

    /// Override the directory results are appended to.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Override the experiment name used for the result files.
    #[arg(long, value_name = "NAME")]
    pub exp_name: Option<String>,

    // --- Compute Overrides ---
    /// Override the distance backend (serial, parallel).
    #[arg(short, long, value_name = "NAME")]
    pub backend: Option<String>,

    /// Only run these metrics, even if others are enabled in the config file.
    /// Can be used multiple times. Example: --only validity --only novelty
    #[arg(long = "only", value_name = "METRIC")]
    pub only: Vec<String>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S metrics.validity.num-samples=20
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `cache` subcommand.
#[derive(Args, Debug)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub command: CacheCommands,
}

/// Available commands for cache management.
#[derive(Subcommand, Debug)]
pub enum CacheCommands {
    /// Fetch every sample and embedding the configured metrics need, without
    /// computing any metric. Accepts the same options as `run`.
    Warm(RunArgs),
    /// Show the number of cached samples and embeddings.
    Info {
        /// The cache directory to inspect.
        #[arg(required = true)]
        path: PathBuf,
    },
}
