//! Anomaly verdict repository.

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::PgPool;

use ops_insight_core::{AnomalyVerdict, Kpi, Severity};

type VerdictTuple =
    (NaiveDate, String, Decimal, f64, f64, Option<f64>, String, String);

pub(crate) fn verdict_from_tuple(tuple: VerdictTuple) -> Result<AnomalyVerdict> {
    let (day, kpi, observed, baseline_mean, baseline_std_dev, score, severity, reason) = tuple;
    Ok(AnomalyVerdict {
        day,
        kpi: Kpi::from_str_opt(&kpi).ok_or_else(|| anyhow!("unknown kpi '{kpi}' in store"))?,
        observed,
        baseline_mean,
        baseline_std_dev,
        score,
        severity: Severity::from_str_opt(&severity)
            .ok_or_else(|| anyhow!("unknown severity '{severity}' in store"))?,
        reason,
    })
}

/// Repository for per-day anomaly verdicts.
#[derive(Debug, Clone)]
pub struct VerdictRepository {
    pool: PgPool,
}

impl VerdictRepository {
    /// Creates a new repository instance.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Fetches all verdicts recorded for a day, in KPI name order.
    ///
    /// # Errors
    /// Returns an error if the query fails or a stored label is unknown.
    pub async fn for_day(&self, day: NaiveDate) -> Result<Vec<AnomalyVerdict>> {
        let rows: Vec<VerdictTuple> = sqlx::query_as(
            r"
            SELECT day, kpi, observed, baseline_mean, baseline_std_dev, score, severity, reason
            FROM anomaly_verdicts
            WHERE day = $1
            ORDER BY kpi ASC
            ",
        )
        .bind(day)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch verdicts")?;

        rows.into_iter().map(verdict_from_tuple).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn tuple(kpi: &str, severity: &str) -> VerdictTuple {
        (
            NaiveDate::from_ymd_opt(2017, 1, 12).unwrap(),
            kpi.to_string(),
            dec!(800),
            1007.86,
            22.70,
            Some(-9.15),
            severity.to_string(),
            "revenue -20.6% vs 7-day mean (drop, z=-9.15)".to_string(),
        )
    }

    #[test]
    fn tuple_mapping_roundtrips_labels() {
        let verdict = verdict_from_tuple(tuple("revenue", "ANOMALY")).unwrap();
        assert_eq!(verdict.kpi, Kpi::Revenue);
        assert_eq!(verdict.severity, Severity::Anomaly);
        assert_eq!(verdict.score, Some(-9.15));
    }

    #[test]
    fn unknown_labels_are_rejected() {
        assert!(verdict_from_tuple(tuple("refunds", "ANOMALY")).is_err());
        assert!(verdict_from_tuple(tuple("revenue", "PANIC")).is_err());
    }
}
