use std::path::Path;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use f4f_core::dashboard::{district_options, DashboardSummary, DistrictFilter};
use f4f_core::error::CoreError;
use f4f_core::pipeline::{run_quality_checks, RunOptions};
use f4f_core::schema::Schema;
use f4f_core::table::RecordTable;
use f4f_ingest::SheetClient;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;

use config::{Cli, Command, FetchArgs, SourceArgs, SummaryArgs, ValidateArgs};

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "f4f_dq=info,f4f_core=info,f4f_ingest=info".into());
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Attach the failed stage to a core error.
fn staged(e: CoreError) -> anyhow::Error {
    let stage = e.stage();
    anyhow::Error::new(e).context(format!("{stage} stage failed"))
}

async fn fetch(source: &SourceArgs, snapshot: &Path) -> anyhow::Result<RecordTable> {
    let client = SheetClient::new(source.source(), source.timeout()).context("ingestion stage failed")?;
    match client.fetch_table(&Schema::farmer_records(), snapshot).await {
        Ok(table) => Ok(table),
        Err(e) => {
            tracing::error!(error = %e, "Error fetching data");
            Err(anyhow::Error::new(e).context("ingestion stage failed"))
        }
    }
}

async fn run_fetch(args: FetchArgs) -> anyhow::Result<()> {
    let table = fetch(&args.source, &args.input).await?;
    tracing::info!(rows = table.len(), path = %args.input.display(), "Loaded rows from sheet export");
    Ok(())
}

async fn run_validate(args: ValidateArgs) -> anyhow::Result<()> {
    let table = if args.fetch {
        fetch(&args.source, &args.input).await?
    } else {
        RecordTable::from_path(&args.input, &Schema::farmer_records()).map_err(staged)?
    };

    let options = RunOptions {
        outputs: args.outputs(),
        policy: args.policy,
        catalog: args.catalog(),
    };
    let run = run_quality_checks(table, &options).map_err(staged)?;
    if let Some(path) = &args.report {
        run.write_violation_report(path).map_err(staged)?;
    }

    println!("{}", serde_json::to_string_pretty(&run.report)?);
    Ok(())
}

fn run_summary(args: SummaryArgs) -> anyhow::Result<()> {
    let table = RecordTable::from_path(&args.clean, &Schema::farmer_records()).map_err(staged)?;

    if args.list_districts {
        for option in district_options(&table) {
            println!("{}", option.label());
        }
        return Ok(());
    }

    let summary = DashboardSummary::compute(&table, &DistrictFilter::from_label(&args.district));
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let result = match cli.command {
        Command::Fetch(args) => run_fetch(args).await,
        Command::Validate(args) => run_validate(args).await,
        Command::Summary(args) => run_summary(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "Run failed");
            eprintln!("f4f-dq: {e:#}");
            ExitCode::FAILURE
        }
    }
}
