use std::sync::Arc;

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use ops_insight_core::{
    DailyReport, DetectionConfig, HistoryStore, RecordFeed, ReportSink, SchedulerConfig,
};
use ops_insight_engine::DailyPipeline;

struct RunContext {
    detection: DetectionConfig,
    feed: Arc<dyn RecordFeed>,
    store: Arc<dyn HistoryStore>,
    sinks: Vec<Arc<dyn ReportSink>>,
}

impl RunContext {
    async fn run_for_yesterday(&self) -> Result<DailyReport> {
        let tz = self.detection.tz()?;
        let today = Utc::now().with_timezone(&tz).date_naive();
        let target_day = today.pred_opt().unwrap_or(today);
        self.run_for(target_day).await
    }

    async fn run_for(&self, target_day: NaiveDate) -> Result<DailyReport> {
        let pipeline = DailyPipeline::new(
            self.detection.clone(),
            self.feed.clone(),
            self.store.clone(),
            self.sinks.clone(),
        )?;
        let report = pipeline.run_daily(target_day).await?;
        Ok(report)
    }
}

pub struct DailyRunScheduler {
    config: SchedulerConfig,
    context: Arc<RunContext>,
}

impl DailyRunScheduler {
    /// Creates a new daily run scheduler.
    #[must_use]
    pub fn new(
        config: SchedulerConfig,
        detection: DetectionConfig,
        feed: Arc<dyn RecordFeed>,
        store: Arc<dyn HistoryStore>,
        sinks: Vec<Arc<dyn ReportSink>>,
    ) -> Self {
        Self {
            config,
            context: Arc::new(RunContext { detection, feed, store, sinks }),
        }
    }

    /// Starts the scheduler and runs according to the cron schedule.
    ///
    /// The external schedule is what guarantees at most one in-flight run;
    /// the store's run lock is the backstop if two ever overlap.
    ///
    /// # Errors
    /// Returns an error if the scheduler fails to start or if job scheduling fails.
    pub async fn start(self) -> Result<()> {
        if !self.config.enabled {
            info!("Daily run scheduler is disabled");
            return Ok(());
        }

        info!(
            "Starting daily run scheduler with cron: {}",
            self.config.cron_schedule
        );

        let scheduler = JobScheduler::new().await?;
        let context = self.context.clone();
        let cron_schedule = self.config.cron_schedule.clone();

        let job = Job::new_async(cron_schedule.as_str(), move |_uuid, _lock| {
            let context = context.clone();
            Box::pin(async move {
                match context.run_for_yesterday().await {
                    Ok(report) => {
                        info!(
                            day = %report.row.day,
                            status = report.status.as_str(),
                            signals = report.signal_count(),
                            "scheduled daily run complete"
                        );
                    }
                    Err(e) => error!("Scheduled daily run failed: {e:#}"),
                }
            })
        })?;

        scheduler.add(job).await?;
        scheduler.start().await?;

        info!("Daily run scheduler started successfully");

        // Keep scheduler running
        loop {
            tokio::time::sleep(tokio::time::Duration::from_secs(60)).await;
        }
    }

    /// Runs the pipeline manually for one day (one-time execution).
    ///
    /// # Errors
    /// Returns an error if the run fails at any stage.
    pub async fn run_once(&self, target_day: NaiveDate) -> Result<DailyReport> {
        self.context.run_for(target_day).await
    }
}
