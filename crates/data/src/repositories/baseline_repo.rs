//! Baseline window value repository.
//!
//! One row per (kpi, day); the window is always read back as the most
//! recent `limit` days in chronological order. Appends arrive in calendar
//! order, so day order and insertion order coincide.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::PgPool;

use ops_insight_core::Kpi;

/// Repository for per-KPI baseline window values.
#[derive(Debug, Clone)]
pub struct BaselineRepository {
    pool: PgPool,
}

impl BaselineRepository {
    /// Creates a new repository instance.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The most recent `limit` recorded values for a KPI, oldest first.
    ///
    /// # Errors
    /// Returns an error if the database query fails.
    pub async fn recent(&self, kpi: Kpi, limit: usize) -> Result<Vec<(NaiveDate, Decimal)>> {
        let rows: Vec<(NaiveDate, Decimal)> = sqlx::query_as(
            r"
            SELECT day, value FROM (
                SELECT day, value
                FROM baseline_values
                WHERE kpi = $1
                ORDER BY day DESC
                LIMIT $2
            ) window ORDER BY day ASC
            ",
        )
        .bind(kpi.as_str())
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .context("Failed to load baseline window")?;

        Ok(rows)
    }
}
