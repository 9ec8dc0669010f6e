use crate::kpi::Kpi;
use crate::records::RawBatch;
use crate::report::{AnomalyVerdict, DailyKpiRow, DailyReport};
use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Source of raw order/item/payment records for a day or date range.
///
/// The feed does no schema validation; it hands rows through for the
/// normalizer to validate. Rows whose timestamp cannot even be parsed for
/// range filtering are still included so the normalizer can count them.
#[async_trait]
pub trait RecordFeed: Send + Sync {
    async fn fetch_range(&self, from: NaiveDate, to: NaiveDate) -> Result<RawBatch>;

    async fn fetch_day(&self, day: NaiveDate) -> Result<RawBatch> {
        self.fetch_range(day, day).await
    }
}

/// Durable store for KPI rows, baseline windows, and verdicts.
///
/// `recent_values` returns the window seed for one KPI in chronological
/// order. `commit_day` must be all-or-nothing: the KPI row, the per-KPI
/// baseline appends (with FIFO pruning), and the verdicts land in a single
/// transaction or not at all.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn kpi_row(&self, day: NaiveDate) -> Result<Option<DailyKpiRow>>;

    async fn kpi_history(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<DailyKpiRow>>;

    /// The most recent `limit` recorded values for a KPI, oldest first.
    async fn recent_values(&self, kpi: Kpi, limit: usize) -> Result<Vec<(NaiveDate, Decimal)>>;

    async fn commit_day(&self, row: &DailyKpiRow, verdicts: &[AnomalyVerdict]) -> Result<()>;
}

/// Consumer of the finished per-day report row. Delivery mechanics beyond
/// the single emit call are out of the engine's scope.
#[async_trait]
pub trait ReportSink: Send + Sync {
    fn name(&self) -> &'static str;

    async fn emit(&self, report: &DailyReport) -> Result<()>;
}
