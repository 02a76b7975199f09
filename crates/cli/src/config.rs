use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use f4f_core::partition::{CleanPolicy, OutputPaths};
use f4f_core::validation::catalog::CatalogConfig;
use f4f_ingest::{SheetSource, DEFAULT_SHEET_ID};

/// Command-line and environment configuration.
///
/// Every flag falls back to an environment variable (loaded from `.env` when
/// present), then to a default suitable for a local `artifacts/` directory.
///
/// | Env Var                  | Default                       |
/// |--------------------------|-------------------------------|
/// | `F4F_INPUT_PATH`         | `artifacts/data.csv`          |
/// | `F4F_CLEAN_PATH`         | `artifacts/cleaned_data.csv`  |
/// | `F4F_FAILED_PATH`        | `artifacts/failed_data.csv`   |
/// | `F4F_REPORT_PATH`        | unset                         |
/// | `F4F_CLEAN_POLICY`       | `exclude-failed`              |
/// | `F4F_VALID_DISTRICTS`    | `A,B`                         |
/// | `F4F_VALID_BLOCKS`       | `p,q,r,s`                     |
/// | `F4F_SHEET_ID`           | programme sheet               |
/// | `F4F_FETCH_TIMEOUT_SECS` | `30`                          |
/// | `F4F_LOG_JSON`           | `false`                       |
#[derive(Debug, Parser)]
#[command(name = "f4f-dq", version, about = "Validate plantation records and split them into clean and failed tables")]
pub struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true, env = "F4F_LOG_JSON")]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Download the sheet export to the input path.
    Fetch(FetchArgs),
    /// Run every data-quality rule and write the clean and failed tables.
    Validate(ValidateArgs),
    /// Print dashboard aggregates for the clean table as JSON.
    Summary(SummaryArgs),
}

#[derive(Debug, Clone, Args)]
pub struct SourceArgs {
    /// Published spreadsheet id.
    #[arg(long, env = "F4F_SHEET_ID", default_value = DEFAULT_SHEET_ID)]
    pub sheet_id: String,

    /// HTTP timeout for the export download, in seconds.
    #[arg(long, env = "F4F_FETCH_TIMEOUT_SECS", default_value_t = 30)]
    pub fetch_timeout_secs: u64,
}

impl SourceArgs {
    pub fn source(&self) -> SheetSource {
        SheetSource::new(self.sheet_id.clone())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

#[derive(Debug, Clone, Args)]
pub struct FetchArgs {
    /// Where the raw export is saved.
    #[arg(long, env = "F4F_INPUT_PATH", default_value = "artifacts/data.csv")]
    pub input: PathBuf,

    #[command(flatten)]
    pub source: SourceArgs,
}

#[derive(Debug, Clone, Args)]
pub struct ValidateArgs {
    /// Input table.
    #[arg(long, env = "F4F_INPUT_PATH", default_value = "artifacts/data.csv")]
    pub input: PathBuf,

    /// Clean output table.
    #[arg(long, env = "F4F_CLEAN_PATH", default_value = "artifacts/cleaned_data.csv")]
    pub clean: PathBuf,

    /// Failed output table, one row per failing uid.
    #[arg(long, env = "F4F_FAILED_PATH", default_value = "artifacts/failed_data.csv")]
    pub failed: PathBuf,

    /// Optional JSON report listing every violation.
    #[arg(long, env = "F4F_REPORT_PATH")]
    pub report: Option<PathBuf>,

    /// `exclude-failed` drops failing rows from the clean table; `advisory`
    /// writes the input unchanged.
    #[arg(long, env = "F4F_CLEAN_POLICY", default_value = "exclude-failed")]
    pub policy: CleanPolicy,

    /// Accepted District values.
    #[arg(long, env = "F4F_VALID_DISTRICTS", value_delimiter = ',', default_values = ["A", "B"])]
    pub valid_districts: Vec<String>,

    /// Accepted Block values.
    #[arg(long, env = "F4F_VALID_BLOCKS", value_delimiter = ',', default_values = ["p", "q", "r", "s"])]
    pub valid_blocks: Vec<String>,

    /// Download a fresh export to the input path before validating.
    #[arg(long)]
    pub fetch: bool,

    #[command(flatten)]
    pub source: SourceArgs,
}

impl ValidateArgs {
    pub fn outputs(&self) -> OutputPaths {
        OutputPaths {
            clean: self.clean.clone(),
            failed: self.failed.clone(),
        }
    }

    pub fn catalog(&self) -> CatalogConfig {
        CatalogConfig {
            valid_districts: trimmed(&self.valid_districts),
            valid_blocks: trimmed(&self.valid_blocks),
            ..CatalogConfig::default()
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct SummaryArgs {
    /// Clean table to summarise.
    #[arg(long, env = "F4F_CLEAN_PATH", default_value = "artifacts/cleaned_data.csv")]
    pub clean: PathBuf,

    /// District view: `Total Area`, `District A` or a bare code.
    #[arg(long, default_value = "Total Area")]
    pub district: String,

    /// List the available district views instead of summarising.
    #[arg(long)]
    pub list_districts: bool,
}

fn trimmed(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
