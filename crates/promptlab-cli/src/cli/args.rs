use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "promptlab",
    version,
    about = "Systematic testing of AI assistant prompts"
)]
pub struct Cli {
    /// Results database path.
    #[arg(long, global = true, default_value = "results.db")]
    pub db: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Execute the experiment matrix.
    Run(RunArgs),
    /// List recorded runs.
    Runs,
    /// Show a run summary (latest run by default).
    Show(ShowArgs),
    /// Validate configuration and corpus layout without invoking any model.
    Validate(ValidateArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Engine configuration file.
    #[arg(long, default_value = "config.json")]
    pub config: PathBuf,

    /// Directory of prompt files (*.md).
    #[arg(long, default_value = "prompts")]
    pub prompts: PathBuf,

    /// Directory of test case files (*.md).
    #[arg(long, default_value = "test_cases")]
    pub cases: PathBuf,

    /// Subset of configured models to run (default: all configured models).
    #[arg(long)]
    pub models: Vec<String>,

    /// Override the configured max simultaneous requests.
    #[arg(long)]
    pub max_concurrent: Option<usize>,

    /// Override the configured minimum seconds between request starts.
    #[arg(long)]
    pub delay: Option<f64>,

    /// Run trials one at a time, in generation order.
    #[arg(long)]
    pub sequential: bool,
}

#[derive(Debug, Args)]
pub struct ShowArgs {
    /// Run to show; defaults to the most recent one.
    #[arg(long)]
    pub run_id: Option<String>,

    /// Also list results with this status: success, failed, or a failure
    /// kind such as rate_limited.
    #[arg(long)]
    pub status: Option<String>,
}

#[derive(Debug, Args)]
pub struct ValidateArgs {
    #[arg(long, default_value = "config.json")]
    pub config: PathBuf,

    #[arg(long, default_value = "prompts")]
    pub prompts: PathBuf,

    #[arg(long, default_value = "test_cases")]
    pub cases: PathBuf,
}
