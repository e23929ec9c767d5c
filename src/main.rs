//! poultry-ops: command-line front end for batch analytics and farm reports
//!
//! Loads records from a JSON dataset (`--data`) or a sled record store
//! (`--db`), runs one operation and prints the result as JSON on stdout.
//! Logs go to stderr through `tracing`; set `RUST_LOG` to change the level.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use clap::Parser;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::info;

use poultry_ops::{
    AnalyticsConfig, BatchId, Dataset, FarmId, GrowthCurveProjector, MemoryStore, RecordSource,
    ReportAggregationService, SledStore,
};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "poultry-ops")]
#[command(about = "Broiler batch analytics and farm reporting")]
#[command(version)]
struct CliArgs {
    /// JSON dataset to analyse (read into memory)
    #[arg(long, global = true, env = "POULTRY_DATA", conflicts_with = "db")]
    data: Option<PathBuf>,

    /// sled record store directory
    #[arg(long, global = true, env = "POULTRY_DB")]
    db: Option<PathBuf>,

    /// Threshold config file (default: $POULTRY_CONFIG, then ./poultry_config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: SubCommand,
}

#[derive(clap::Subcommand, Debug)]
enum SubCommand {
    /// Replace the sled record store given by --db with a JSON dataset
    Import {
        /// Dataset file to import
        #[arg(long = "from")]
        from: PathBuf,
    },

    /// Build a farm report for an inclusive UTC window
    Report {
        #[arg(value_enum)]
        kind: ReportKind,
        #[command(flatten)]
        window: WindowArgs,
    },

    /// Lifetime performance snapshot of a batch
    Performance {
        #[arg(long)]
        batch: BatchId,
    },

    /// Observed weighings against the Cobb 500 curve
    Curve {
        #[arg(long)]
        batch: BatchId,
    },

    /// Project weight on a date, or the date a target weight is reached
    Project {
        #[arg(long)]
        batch: BatchId,
        /// Target date (YYYY-MM-DD)
        #[arg(long, required_unless_present = "weight", conflicts_with = "weight")]
        date: Option<NaiveDate>,
        /// Target live weight in grams
        #[arg(long)]
        weight: Option<f64>,
    },

    /// Out-of-standard alerts for every batch on a farm
    Alerts {
        #[command(flatten)]
        window: WindowArgs,
    },
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ReportKind {
    Financial,
    General,
    Consumption,
    Weighing,
    Sanitary,
    Sensor,
}

#[derive(clap::Args, Debug)]
struct WindowArgs {
    #[arg(long)]
    farm: FarmId,
    /// Window start: RFC 3339 instant or YYYY-MM-DD (start of day)
    #[arg(long, value_parser = parse_start)]
    start: DateTime<Utc>,
    /// Window end: RFC 3339 instant or YYYY-MM-DD (end of day)
    #[arg(long, value_parser = parse_end)]
    end: DateTime<Utc>,
}

fn parse_instant(s: &str, time_of_day: NaiveTime) -> Result<DateTime<Utc>, String> {
    if let Ok(instant) = s.parse::<DateTime<Utc>>() {
        return Ok(instant);
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map(|d| d.and_time(time_of_day).and_utc())
        .map_err(|_| format!("expected an RFC 3339 instant or YYYY-MM-DD, got '{s}'"))
}

fn parse_start(s: &str) -> Result<DateTime<Utc>, String> {
    parse_instant(s, NaiveTime::MIN)
}

fn parse_end(s: &str) -> Result<DateTime<Utc>, String> {
    let end_of_day = NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN);
    parse_instant(s, end_of_day)
}

// ============================================================================
// Helpers
// ============================================================================

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn load_config(path: Option<&PathBuf>) -> Result<AnalyticsConfig> {
    match path {
        Some(p) => AnalyticsConfig::load_from_file(p)
            .with_context(|| format!("loading config {}", p.display())),
        None => Ok(AnalyticsConfig::load()),
    }
}

fn open_source(args: &CliArgs) -> Result<Arc<dyn RecordSource>> {
    if let Some(db) = &args.db {
        let store = SledStore::open(db).with_context(|| format!("opening {}", db.display()))?;
        return Ok(Arc::new(store));
    }
    if let Some(data) = &args.data {
        let dataset =
            Dataset::load_json(data).with_context(|| format!("loading {}", data.display()))?;
        info!(
            "📥 Dataset: {} farms, {} batches from {}",
            dataset.farms.len(),
            dataset.batches.len(),
            data.display()
        );
        return Ok(Arc::new(MemoryStore::new(dataset)?));
    }
    Err(anyhow::anyhow!(
        "No record source. Pass --data <file.json> or --db <dir>"
    ))
}

async fn run_report(
    service: &ReportAggregationService,
    kind: ReportKind,
    w: &WindowArgs,
    cancel: &CancellationToken,
) -> Result<()> {
    match kind {
        ReportKind::Financial => {
            print_json(&service.financial_report(w.farm, w.start, w.end, cancel).await?)
        }
        ReportKind::General => {
            print_json(&service.general_report(w.farm, w.start, w.end, cancel).await?)
        }
        ReportKind::Consumption => {
            print_json(&service.consumption_report(w.farm, w.start, w.end, cancel).await?)
        }
        ReportKind::Weighing => {
            print_json(&service.weighing_report(w.farm, w.start, w.end, cancel).await?)
        }
        ReportKind::Sanitary => {
            print_json(&service.sanitary_report(w.farm, w.start, w.end, cancel).await?)
        }
        ReportKind::Sensor => {
            print_json(&service.sensor_report(w.farm, w.start, w.end, cancel).await?)
        }
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    // Logs on stderr so stdout stays valid JSON
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = CliArgs::parse();

    if let SubCommand::Import { from } = &args.command {
        let db = args
            .db
            .as_ref()
            .context("import needs --db <dir> to write into")?;
        let dataset =
            Dataset::load_json(from).with_context(|| format!("loading {}", from.display()))?;
        let stats = SledStore::open(db)?.import(&dataset)?;
        return print_json(&serde_json::json!({
            "farms": stats.farms,
            "batches": stats.batches,
            "records": stats.records,
        }));
    }

    let config = load_config(args.config.as_ref())?;
    info!("Farm: {}", config.farm.name);
    let source = open_source(&args)?;
    info!("Record source: {}", source.source_name());
    let service = ReportAggregationService::new(source, config);

    // Ctrl+C cancels the running computation
    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("🛑 Received Ctrl+C, cancelling...");
        shutdown_token.cancel();
    });
    let cancel = &cancel_token;

    match &args.command {
        SubCommand::Import { .. } => Ok(()),
        SubCommand::Report { kind, window } => run_report(&service, *kind, window, cancel).await,
        SubCommand::Performance { batch } => {
            print_json(&service.batch_performance(*batch, cancel).await?)
        }
        SubCommand::Curve { batch } => print_json(
            &service
                .projector()
                .batch_curve(service.aggregator(), *batch, cancel)
                .await?,
        ),
        SubCommand::Project { batch, date, weight } => {
            let projector: &GrowthCurveProjector = service.projector();
            match (date, weight) {
                (Some(date), _) => print_json(
                    &projector
                        .project_batch_weight(service.aggregator(), *batch, *date, cancel)
                        .await?,
                ),
                (None, Some(weight)) => print_json(
                    &projector
                        .project_batch_slaughter_date(service.aggregator(), *batch, *weight, cancel)
                        .await?,
                ),
                (None, None) => Err(anyhow::anyhow!("Pass --date or --weight")),
            }
        }
        SubCommand::Alerts { window } => print_json(
            &service
                .farm_alerts(window.farm, window.start, window.end, cancel)
                .await?,
        ),
    }
}
