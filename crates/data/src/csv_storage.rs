//! CSV export of the daily metrics history and the appending report sink.

use std::fs::{File, OpenOptions};
use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use csv::{Writer, WriterBuilder};

use ops_insight_core::{DailyKpiRow, DailyReport, Kpi, ReportSink};

const REPORT_HEADER: [&str; 10] = [
    "date",
    "orders_count",
    "revenue",
    "canceled_orders",
    "avg_order_value",
    "status",
    "orders_severity",
    "revenue_severity",
    "cancellations_severity",
    "aov_severity",
];

pub struct CsvMetricsExport;

impl CsvMetricsExport {
    /// Writes the KPI history to a CSV file, one row per day.
    ///
    /// Format: `date,orders_count,revenue,canceled_orders,avg_order_value`,
    /// with an undefined AOV written as 0 the way the zero-filled calendar
    /// spine does.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created or writing fails.
    pub fn write_history(path: &str, rows: &[DailyKpiRow]) -> Result<()> {
        let file =
            File::create(path).with_context(|| format!("Failed to create CSV file: {path}"))?;
        let mut writer = Writer::from_writer(file);

        writer.write_record([
            "date",
            "orders_count",
            "revenue",
            "canceled_orders",
            "avg_order_value",
        ])?;

        let mut sorted = rows.to_vec();
        sorted.sort_by_key(|r| r.day);

        for row in sorted {
            writer.write_record(&[
                row.day.to_string(),
                row.orders_count.to_string(),
                row.revenue.to_string(),
                row.cancellations.to_string(),
                row.aov.unwrap_or_default().to_string(),
            ])?;
        }

        writer.flush()?;
        Ok(())
    }
}

/// Report sink appending one wide row per day to the metrics CSV.
pub struct CsvReportSink {
    path: String,
}

impl CsvReportSink {
    #[must_use]
    pub const fn new(path: String) -> Self {
        Self { path }
    }

    fn severity_of(report: &DailyReport, kpi: Kpi) -> &'static str {
        report
            .verdicts
            .iter()
            .find(|v| v.kpi == kpi)
            .map_or("", |v| v.severity.as_str())
    }

    fn append_row(&self, report: &DailyReport) -> Result<()> {
        let fresh = !Path::new(&self.path).exists();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open report CSV: {}", self.path))?;
        let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);

        if fresh {
            writer.write_record(REPORT_HEADER)?;
        }

        let row = &report.row;
        writer.write_record(&[
            row.day.to_string(),
            row.orders_count.to_string(),
            row.revenue.to_string(),
            row.cancellations.to_string(),
            row.aov.unwrap_or_default().to_string(),
            report.status.as_str().to_string(),
            Self::severity_of(report, Kpi::OrdersCount).to_string(),
            Self::severity_of(report, Kpi::Revenue).to_string(),
            Self::severity_of(report, Kpi::Cancellations).to_string(),
            Self::severity_of(report, Kpi::Aov).to_string(),
        ])?;

        writer.flush()?;
        Ok(())
    }
}

#[async_trait]
impl ReportSink for CsvReportSink {
    fn name(&self) -> &'static str {
        "csv"
    }

    async fn emit(&self, report: &DailyReport) -> Result<()> {
        self.append_row(report)
    }
}
