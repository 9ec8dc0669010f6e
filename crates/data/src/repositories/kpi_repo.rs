//! Daily KPI row repository.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::PgPool;

use ops_insight_core::DailyKpiRow;

type KpiTuple = (NaiveDate, i64, Decimal, i64, Option<Decimal>);

pub(crate) fn row_from_tuple((day, orders, revenue, cancellations, aov): KpiTuple) -> DailyKpiRow {
    DailyKpiRow {
        day,
        orders_count: u32::try_from(orders).unwrap_or(u32::MAX),
        revenue,
        cancellations: u32::try_from(cancellations).unwrap_or(u32::MAX),
        aov,
    }
}

/// Repository for per-day KPI rows.
#[derive(Debug, Clone)]
pub struct DailyKpiRepository {
    pool: PgPool,
}

impl DailyKpiRepository {
    /// Creates a new repository instance.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Fetches the KPI row for one day, if recorded.
    ///
    /// # Errors
    /// Returns an error if the database query fails.
    pub async fn get(&self, day: NaiveDate) -> Result<Option<DailyKpiRow>> {
        let row: Option<KpiTuple> = sqlx::query_as(
            r"
            SELECT day, orders_count, revenue, cancellations, aov
            FROM daily_kpi
            WHERE day = $1
            ",
        )
        .bind(day)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch daily KPI row")?;

        Ok(row.map(row_from_tuple))
    }

    /// Fetches KPI rows within a date range, oldest first.
    ///
    /// # Errors
    /// Returns an error if the database query fails.
    pub async fn range(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<DailyKpiRow>> {
        let rows: Vec<KpiTuple> = sqlx::query_as(
            r"
            SELECT day, orders_count, revenue, cancellations, aov
            FROM daily_kpi
            WHERE day >= $1 AND day <= $2
            ORDER BY day ASC
            ",
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch daily KPI history")?;

        Ok(rows.into_iter().map(row_from_tuple).collect())
    }

    /// Upserts one KPI row outside the per-day commit transaction.
    ///
    /// # Errors
    /// Returns an error if the database insertion fails.
    pub async fn upsert(&self, row: &DailyKpiRow) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO daily_kpi (day, orders_count, revenue, cancellations, aov)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (day) DO UPDATE
            SET orders_count = EXCLUDED.orders_count,
                revenue = EXCLUDED.revenue,
                cancellations = EXCLUDED.cancellations,
                aov = EXCLUDED.aov
            ",
        )
        .bind(row.day)
        .bind(i64::from(row.orders_count))
        .bind(row.revenue)
        .bind(i64::from(row.cancellations))
        .bind(row.aov)
        .execute(&self.pool)
        .await
        .context("Failed to upsert daily KPI row")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn tuple_mapping_preserves_fields() {
        let day = NaiveDate::from_ymd_opt(2017, 1, 12).unwrap();
        let row = row_from_tuple((day, 3, dec!(80), 1, Some(dec!(26.67))));
        assert_eq!(row.orders_count, 3);
        assert_eq!(row.revenue, dec!(80));
        assert_eq!(row.cancellations, 1);
        assert_eq!(row.aov, Some(dec!(26.67)));
    }

    #[test]
    fn tuple_mapping_keeps_missing_aov() {
        let day = NaiveDate::from_ymd_opt(2017, 1, 12).unwrap();
        let row = row_from_tuple((day, 0, dec!(0), 0, None));
        assert_eq!(row.aov, None);
    }
}
