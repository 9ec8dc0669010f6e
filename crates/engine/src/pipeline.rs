//! Daily pipeline orchestration: feed, normalize, aggregate, classify,
//! commit, emit.
//!
//! Each run produces either the complete day (KPI row plus one verdict per
//! KPI, committed in a single transaction) or nothing at all plus an error
//! naming the failed stage.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::aggregator::aggregate_day;
use crate::baseline::BaselineTracker;
use crate::classifier::classify;
use crate::normalizer::{NormalizedBatch, RecordNormalizer};
use ops_insight_core::{
    AnomalyVerdict, DailyKpiRow, DailyReport, DetectionConfig, HistoryStore, Kpi, PipelineError,
    RecordFeed, ReportSink,
};

/// One engine invocation scope: validated detection config plus the three
/// external collaborators behind their traits.
pub struct DailyPipeline {
    detection: DetectionConfig,
    feed: Arc<dyn RecordFeed>,
    store: Arc<dyn HistoryStore>,
    sinks: Vec<Arc<dyn ReportSink>>,
}

impl DailyPipeline {
    /// Builds a pipeline, failing fast on unusable detection settings
    /// before any record is touched.
    ///
    /// # Errors
    /// Returns `PipelineError::Config` for invalid window sizes,
    /// thresholds, or timezone.
    pub fn new(
        detection: DetectionConfig,
        feed: Arc<dyn RecordFeed>,
        store: Arc<dyn HistoryStore>,
        sinks: Vec<Arc<dyn ReportSink>>,
    ) -> Result<Self, PipelineError> {
        detection.validate()?;
        Ok(Self { detection, feed, store, sinks })
    }

    /// Runs the engine for one target day.
    ///
    /// # Errors
    /// `Feed`, `Storage`, or `Sink` variants of [`PipelineError`]; storage
    /// failures leave no partial day behind.
    pub async fn run_daily(&self, target_day: NaiveDate) -> Result<DailyReport, PipelineError> {
        let normalized = self.fetch_and_normalize(target_day, target_day).await?;
        let tracker = self.seed_tracker().await?;

        let row = aggregate_day(&normalized.facts, target_day);
        let verdicts = self.classify_row(&tracker, &row);
        self.commit(&row, &verdicts).await?;

        let report = DailyReport::new(row, verdicts);
        self.emit(&report).await?;
        info!(day = %target_day, status = report.status.as_str(), "daily run complete");
        Ok(report)
    }

    /// Replays a date range in chronological order.
    ///
    /// Aggregation of each day is independent; baseline reads, commits and
    /// appends are applied strictly in calendar order so the FIFO window
    /// semantics hold. Days with no orders still produce a zero row, which
    /// keeps the baseline moving across calendar gaps.
    ///
    /// # Errors
    /// Same as [`DailyPipeline::run_daily`]; the first failing day aborts
    /// the remainder of the range.
    pub async fn run_backfill(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyReport>, PipelineError> {
        if from > to {
            return Err(PipelineError::Config(format!(
                "backfill range is inverted: {from} > {to}"
            )));
        }

        let normalized = self.fetch_and_normalize(from, to).await?;
        let mut tracker = self.seed_tracker().await?;

        let days: Vec<NaiveDate> = from.iter_days().take_while(|d| *d <= to).collect();
        let mut reports = Vec::with_capacity(days.len());
        for day in days {
            let row = aggregate_day(&normalized.facts, day);
            let verdicts = self.classify_row(&tracker, &row);
            self.commit(&row, &verdicts).await?;
            for kpi in Kpi::ALL {
                tracker.record(kpi, day, row.value_of(kpi));
            }
            let report = DailyReport::new(row, verdicts);
            self.emit(&report).await?;
            reports.push(report);
        }
        info!(from = %from, to = %to, days = reports.len(), "backfill complete");
        Ok(reports)
    }

    async fn fetch_and_normalize(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<NormalizedBatch, PipelineError> {
        let tz = self.detection.tz()?;
        let batch = self
            .feed
            .fetch_range(from, to)
            .await
            .map_err(|source| PipelineError::Feed { source })?;

        let normalized = RecordNormalizer::new(tz).normalize(&batch);
        if normalized.excluded > 0 || normalized.duplicates > 0 || normalized.orphan_payments > 0 {
            warn!(
                excluded = normalized.excluded,
                duplicates = normalized.duplicates,
                orphan_payments = normalized.orphan_payments,
                "data-quality findings in raw batch"
            );
        }
        info!(facts = normalized.facts.len(), "normalized raw batch");
        Ok(normalized)
    }

    async fn seed_tracker(&self) -> Result<BaselineTracker, PipelineError> {
        BaselineTracker::seed(self.store.as_ref(), self.detection.window_size)
            .await
            .map_err(|source| PipelineError::Storage { stage: "baseline load", source })
    }

    fn classify_row(&self, tracker: &BaselineTracker, row: &DailyKpiRow) -> Vec<AnomalyVerdict> {
        let policy = self.detection.thresholds();
        Kpi::ALL
            .iter()
            .map(|&kpi| {
                classify(
                    row.day,
                    kpi,
                    row.value_of(kpi),
                    &tracker.current(kpi),
                    &policy,
                    self.detection.min_window,
                )
            })
            .collect()
    }

    async fn commit(
        &self,
        row: &DailyKpiRow,
        verdicts: &[AnomalyVerdict],
    ) -> Result<(), PipelineError> {
        self.store
            .commit_day(row, verdicts)
            .await
            .map_err(|source| PipelineError::Storage { stage: "day commit", source })
    }

    async fn emit(&self, report: &DailyReport) -> Result<(), PipelineError> {
        for sink in &self.sinks {
            sink.emit(report).await.map_err(|source| PipelineError::Sink {
                sink: sink.name().to_string(),
                source,
            })?;
        }
        Ok(())
    }
}
