//! Command implementations wiring config, storage, feed, and sinks into
//! the engine.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use tracing::info;

use ops_insight_core::{
    AppConfig, ConfigLoader, HistoryStore, RecordFeed, ReportSink,
};
use ops_insight_data::{
    CsvMetricsExport, CsvRecordFeed, CsvReportSink, DailyKpiRepository, DatabaseClient,
    PgHistoryStore, VerdictRepository, WebhookSink,
};
use ops_insight_engine::DailyPipeline;
use ops_insight_scheduler::DailyRunScheduler;
use ops_insight_web_api::{ApiServer, AppState};

struct Runtime {
    config: AppConfig,
    db: DatabaseClient,
    feed: Arc<dyn RecordFeed>,
    store: Arc<dyn HistoryStore>,
    sinks: Vec<Arc<dyn ReportSink>>,
}

async fn wire(config_path: &str) -> Result<Runtime> {
    let config = ConfigLoader::load_from(config_path)
        .with_context(|| format!("Failed to load config from {config_path}"))?;
    // Fail fast on bad detection settings before touching storage.
    config.detection.validate()?;

    let db = DatabaseClient::connect(&config.database)
        .await
        .context("Failed to connect to the historical store")?;
    db.init_schema().await.context("Failed to initialize schema")?;

    let store: Arc<dyn HistoryStore> =
        Arc::new(PgHistoryStore::new(db.pool(), config.detection.window_size));
    let feed: Arc<dyn RecordFeed> = Arc::new(CsvRecordFeed::new(config.feed.clone()));

    let mut sinks: Vec<Arc<dyn ReportSink>> = Vec::new();
    if let Some(path) = &config.report.csv_path {
        sinks.push(Arc::new(CsvReportSink::new(path.clone())));
    }
    if let Some(url) = &config.report.webhook_url {
        sinks.push(Arc::new(WebhookSink::new(
            url.clone(),
            config.report.webhook_timeout_secs,
        )?));
    }

    Ok(Runtime { config, db, feed, store, sinks })
}

fn parse_day(raw: &str) -> Result<NaiveDate> {
    raw.parse::<NaiveDate>()
        .with_context(|| format!("Invalid date '{raw}', expected YYYY-MM-DD"))
}

/// Runs the pipeline for one day and prints the report summary.
pub async fn run_daily(config_path: &str, date: Option<&str>) -> Result<()> {
    let runtime = wire(config_path).await?;

    let target_day = match date {
        Some(raw) => parse_day(raw)?,
        None => {
            let tz = runtime.config.detection.tz()?;
            let today = Utc::now().with_timezone(&tz).date_naive();
            today.pred_opt().unwrap_or(today)
        }
    };

    let pipeline = DailyPipeline::new(
        runtime.config.detection.clone(),
        runtime.feed,
        runtime.store,
        runtime.sinks,
    )?;
    let report = pipeline.run_daily(target_day).await?;

    println!("{}", report.summary);
    Ok(())
}

/// Replays a date range chronologically and prints one line per day.
pub async fn backfill(config_path: &str, start: &str, end: &str) -> Result<()> {
    let runtime = wire(config_path).await?;
    let from = parse_day(start)?;
    let to = parse_day(end)?;

    let pipeline = DailyPipeline::new(
        runtime.config.detection.clone(),
        runtime.feed,
        runtime.store,
        runtime.sinks,
    )?;
    let reports = pipeline.run_backfill(from, to).await?;

    for report in &reports {
        println!(
            "{} {} ({} signals)",
            report.row.day,
            report.status.as_str(),
            report.signal_count()
        );
    }
    info!("Backfill committed {} days", reports.len());
    Ok(())
}

/// Exports the stored KPI history for a date range to CSV.
pub async fn export(config_path: &str, start: &str, end: &str, output: &str) -> Result<()> {
    let runtime = wire(config_path).await?;
    let from = parse_day(start)?;
    let to = parse_day(end)?;

    let rows = runtime.store.kpi_history(from, to).await?;
    CsvMetricsExport::write_history(output, &rows)?;
    println!("Wrote {} rows to {output}", rows.len());
    Ok(())
}

/// Starts the HTTP trigger API.
pub async fn server(config_path: &str) -> Result<()> {
    let runtime = wire(config_path).await?;
    let addr = format!(
        "{}:{}",
        runtime.config.server.host, runtime.config.server.port
    );

    let state = AppState {
        auth_token: runtime.config.server.auth_token.clone(),
        detection: runtime.config.detection.clone(),
        feed: runtime.feed,
        store: runtime.store,
        sinks: runtime.sinks,
        kpi: DailyKpiRepository::new(runtime.db.pool()),
        verdicts: VerdictRepository::new(runtime.db.pool()),
    };

    ApiServer::new(Arc::new(state)).serve(&addr).await
}

/// Runs the cron scheduler until interrupted.
pub async fn schedule(config_path: &str) -> Result<()> {
    let runtime = wire(config_path).await?;

    DailyRunScheduler::new(
        runtime.config.scheduler.clone(),
        runtime.config.detection.clone(),
        runtime.feed,
        runtime.store,
        runtime.sinks,
    )
    .start()
    .await
}
