//! CLI application for covid19 snapshot ingestion and queries.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use covid19_aggregator::SourceAggregator;
use covid19_db::{list_sources, DbPool, SqliteSnapshotStore};
use covid19_ingestion::{read_snapshot_csv, SnapshotProcessor};
use covid19_telemetry::{init_logging, LogFormat, Metrics};
use serde::Serialize;
use tokio::time::sleep;
use tracing::{debug, error, info};

#[derive(Parser)]
#[command(name = "covid19")]
#[command(about = "Case snapshot store with daily series and growth analytics")]
struct Cli {
    /// Database path
    #[arg(long, global = true, default_value = "covid19.db")]
    database_path: String,

    /// Log level or filter directive
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Log output format (json or pretty)
    #[arg(long, global = true, default_value = "json")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Admit one snapshot CSV file
    Import {
        /// Source the snapshot belongs to
        #[arg(long)]
        source: String,

        /// Snapshot CSV path
        #[arg(long)]
        file: PathBuf,

        /// Snapshot timestamp (RFC 3339)
        #[arg(long)]
        timestamp: DateTime<Utc>,
    },
    /// Poll a directory of snapshot files and admit new ones
    Watch {
        /// Source the snapshots belong to
        #[arg(long)]
        source: String,

        /// Directory holding <YYYYMMDDTHHMMSSZ>.csv files
        #[arg(long)]
        snapshot_dir: PathBuf,

        /// Poll interval in seconds
        #[arg(long, default_value = "300")]
        poll_interval_seconds: u64,

        /// Metrics bind address
        #[arg(long, default_value = "0.0.0.0:9090")]
        metrics_bind_address: String,

        /// Sample output path for audit logs
        #[arg(long)]
        sample_output_path: Option<String>,

        /// Scan the directory once and exit
        #[arg(long, default_value = "false")]
        once: bool,
    },
    /// List registered sources
    Sources,
    /// Latest region counts and national totals
    Cases {
        #[arg(long)]
        source: String,

        /// Use the latest entry on or before this day (YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Daily national series, or a single region's series
    Daily {
        #[arg(long)]
        source: String,

        /// Region code to restrict the series to
        #[arg(long)]
        state: Option<String>,
    },
    /// Daily series of every region
    States {
        #[arg(long)]
        source: String,
    },
    /// Growth window and doubling time per region
    Growth {
        #[arg(long)]
        source: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref(), cli.log_format)?;

    let db = DbPool::new(&cli.database_path).await?;
    db.migrate().await?;
    let metrics = Metrics::new()?;

    let result = run(cli.command, &db, metrics).await;
    db.close().await;
    result
}

async fn run(command: Commands, db: &DbPool, metrics: Metrics) -> anyhow::Result<()> {
    match command {
        Commands::Import {
            source,
            file,
            timestamp,
        } => {
            let aggregator = open_aggregator(db, &source, metrics).await?;
            let rows = read_snapshot_csv(&file)?;
            let admission = aggregator.add_new_entry(timestamp, &rows).await?;
            info!("Import of {:?} into {}: {:?}", file, source, admission);
        }
        Commands::Watch {
            source,
            snapshot_dir,
            poll_interval_seconds,
            metrics_bind_address,
            sample_output_path,
            once,
        } => {
            let aggregator = open_aggregator(db, &source, metrics.clone()).await?;
            let processor = SnapshotProcessor::new(aggregator, metrics.clone(), sample_output_path);
            if !once {
                start_metrics_server(&metrics_bind_address, metrics).await?;
            }
            run_watch(
                &processor,
                &snapshot_dir,
                Duration::from_secs(poll_interval_seconds),
                once,
            )
            .await?;
        }
        Commands::Sources => print_json(&list_sources(db).await?)?,
        Commands::Cases { source, date } => {
            let aggregator = open_aggregator(db, &source, metrics).await?;
            print_json(&aggregator.get_cases(date).await?)?;
        }
        Commands::Daily { source, state } => {
            let aggregator = open_aggregator(db, &source, metrics).await?;
            print_json(&aggregator.get_daily_cases(state.as_deref()).await?)?;
        }
        Commands::States { source } => {
            let aggregator = open_aggregator(db, &source, metrics).await?;
            print_json(&aggregator.get_daily_cases_by_state().await?)?;
        }
        Commands::Growth { source } => {
            let aggregator = open_aggregator(db, &source, metrics).await?;
            print_json(&aggregator.get_cases_growth().await?)?;
        }
    }

    Ok(())
}

async fn open_aggregator(
    db: &DbPool,
    source: &str,
    metrics: Metrics,
) -> anyhow::Result<SourceAggregator<SqliteSnapshotStore>> {
    let store = SqliteSnapshotStore::open(db.clone(), source).await?;
    Ok(SourceAggregator::new(store, metrics))
}

fn print_json<T: Serialize>(payload: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(payload)?);
    Ok(())
}

async fn run_watch(
    processor: &SnapshotProcessor<SqliteSnapshotStore>,
    snapshot_dir: &Path,
    poll_duration: Duration,
    once: bool,
) -> anyhow::Result<()> {
    info!(
        "Watching {:?} for {} snapshots",
        snapshot_dir,
        processor.aggregator().name()
    );

    loop {
        match processor.process_dir(snapshot_dir).await {
            Ok(summary) if summary.admitted > 0 || summary.failed > 0 => {
                info!(
                    "Scan of {:?}: {} admitted, {} already stored, {} failed",
                    snapshot_dir, summary.admitted, summary.duplicates, summary.failed
                );
            }
            Ok(summary) => {
                debug!("No new snapshots, {} already stored", summary.duplicates);
            }
            Err(e) => {
                error!("Failed to scan {:?}: {:#}", snapshot_dir, e);
            }
        }

        if once {
            return Ok(());
        }
        sleep(poll_duration).await;
    }
}

async fn start_metrics_server(addr: &str, metrics: Metrics) -> anyhow::Result<()> {
    use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Router};
    use std::sync::Arc;

    let metrics = Arc::new(metrics);

    async fn metrics_handler(
        State(metrics): State<Arc<Metrics>>,
    ) -> Result<impl IntoResponse, StatusCode> {
        match metrics.gather() {
            Ok(body) => Ok((StatusCode::OK, body)),
            Err(_) => Err(StatusCode::INTERNAL_SERVER_ERROR),
        }
    }

    let app = Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metrics);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Metrics server listening on http://{}", addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Metrics server error: {}", e);
        }
    });

    Ok(())
}
