//! Daily KPI rows, anomaly verdicts, and the per-day report row.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::kpi::{Kpi, Severity};

/// Aggregated KPIs for one calendar day. Produced exactly once per day and
/// immutable after creation.
///
/// `cancellations` is tracked independently of `orders_count`: the count
/// measures demand (every order attempted that day), cancellations the
/// subset that ended cancelled. No subtraction between the two.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyKpiRow {
    pub day: NaiveDate,
    pub orders_count: u32,
    pub revenue: Decimal,
    pub cancellations: u32,
    /// None iff `orders_count` is 0.
    pub aov: Option<Decimal>,
}

impl DailyKpiRow {
    /// A zero row for a day with no orders (calendar-spine fill during
    /// backfill).
    #[must_use]
    pub const fn empty(day: NaiveDate) -> Self {
        Self {
            day,
            orders_count: 0,
            revenue: Decimal::ZERO,
            cancellations: 0,
            aov: None,
        }
    }

    /// The day's value for one KPI.
    ///
    /// An undefined AOV (no orders) is evaluated as 0 for baseline and
    /// classification purposes, matching the zero-fill of empty days.
    #[must_use]
    pub fn value_of(&self, kpi: Kpi) -> Decimal {
        match kpi {
            Kpi::OrdersCount => Decimal::from(self.orders_count),
            Kpi::Revenue => self.revenue,
            Kpi::Cancellations => Decimal::from(self.cancellations),
            Kpi::Aov => self.aov.unwrap_or(Decimal::ZERO),
        }
    }
}

/// One KPI's classification for one day. Immutable; consumed by the report
/// sinks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyVerdict {
    pub day: NaiveDate,
    pub kpi: Kpi,
    pub observed: Decimal,
    pub baseline_mean: f64,
    pub baseline_std_dev: f64,
    /// Deviation z-score; None when the baseline cannot produce one
    /// (insufficient window or zero variance).
    pub score: Option<f64>,
    pub severity: Severity,
    pub reason: String,
}

impl AnomalyVerdict {
    /// "down" for a value below the baseline mean, "up" otherwise.
    #[must_use]
    pub fn direction(&self) -> &'static str {
        let mean = Decimal::try_from(self.baseline_mean).unwrap_or(Decimal::ZERO);
        if self.observed < mean {
            "down"
        } else {
            "up"
        }
    }
}

/// Overall status of a day's run, derived from its verdicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Normal,
    AnomalyDetected,
    InsufficientData,
}

impl RunStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::AnomalyDetected => "anomaly_detected",
            Self::InsufficientData => "insufficient_data",
        }
    }
}

/// The wide per-day row handed to report sinks: KPIs plus one verdict per
/// KPI, an overall status, and a human-readable summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyReport {
    pub row: DailyKpiRow,
    /// One verdict per KPI, in [`Kpi::ALL`] order.
    pub verdicts: Vec<AnomalyVerdict>,
    pub status: RunStatus,
    pub summary: String,
}

impl DailyReport {
    /// Assembles the report row from the day's KPIs and verdicts.
    #[must_use]
    pub fn new(row: DailyKpiRow, verdicts: Vec<AnomalyVerdict>) -> Self {
        let status = derive_status(&verdicts);
        let summary = format_summary(&row, &verdicts, status);
        Self { row, verdicts, status, summary }
    }

    /// Verdicts that crossed a threshold (WATCH or ANOMALY).
    pub fn signals(&self) -> impl Iterator<Item = &AnomalyVerdict> {
        self.verdicts.iter().filter(|v| v.severity.is_signal())
    }

    #[must_use]
    pub fn signal_count(&self) -> usize {
        self.signals().count()
    }
}

fn derive_status(verdicts: &[AnomalyVerdict]) -> RunStatus {
    if verdicts.iter().any(|v| v.severity.is_signal()) {
        RunStatus::AnomalyDetected
    } else if !verdicts.is_empty()
        && verdicts.iter().all(|v| v.severity == Severity::InsufficientData)
    {
        RunStatus::InsufficientData
    } else {
        RunStatus::Normal
    }
}

fn verdict_mean(verdicts: &[AnomalyVerdict], kpi: Kpi) -> f64 {
    verdicts
        .iter()
        .find(|v| v.kpi == kpi)
        .map_or(0.0, |v| v.baseline_mean)
}

fn format_summary(row: &DailyKpiRow, verdicts: &[AnomalyVerdict], status: RunStatus) -> String {
    let mut lines = vec![
        format!("Date: {} | Status: {}", row.day, status.as_str()),
        format!(
            "Orders: {} (mean {:.1}) | Revenue: {:.2} (mean {:.2})",
            row.orders_count,
            verdict_mean(verdicts, Kpi::OrdersCount),
            row.revenue,
            verdict_mean(verdicts, Kpi::Revenue),
        ),
        format!(
            "Cancellations: {} (mean {:.1}) | AOV: {} (mean {:.2})",
            row.cancellations,
            verdict_mean(verdicts, Kpi::Cancellations),
            row.aov.map_or_else(|| "n/a".to_string(), |v| format!("{v:.2}")),
            verdict_mean(verdicts, Kpi::Aov),
        ),
    ];

    let signals: Vec<&AnomalyVerdict> = verdicts.iter().filter(|v| v.severity.is_signal()).collect();
    if signals.is_empty() {
        lines.push("Signals: none".to_string());
    } else {
        lines.push("Signals:".to_string());
        for v in signals {
            lines.push(format!(
                "- {} ({}, {}): {}",
                v.kpi.as_str(),
                v.direction(),
                v.severity.as_str(),
                v.reason
            ));
        }
    }

    lines.join("\n")
}
