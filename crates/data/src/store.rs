//! Transactional history store over `PostgreSQL`.
//!
//! `commit_day` writes the KPI row, the four baseline appends (with FIFO
//! pruning), and the verdicts in one transaction under a per-pipeline
//! advisory lock, so a day is either fully visible or not at all and
//! overlapping runs cannot interleave their read-then-append.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::PgPool;

use ops_insight_core::{AnomalyVerdict, DailyKpiRow, HistoryStore, Kpi};

use crate::repositories::{BaselineRepository, DailyKpiRepository};

const RUN_LOCK_KEY: &str = "ops-insight-daily";

pub struct PgHistoryStore {
    pool: PgPool,
    window_cap: usize,
    kpi: DailyKpiRepository,
    baselines: BaselineRepository,
}

impl PgHistoryStore {
    #[must_use]
    pub fn new(pool: PgPool, window_cap: usize) -> Self {
        Self {
            kpi: DailyKpiRepository::new(pool.clone()),
            baselines: BaselineRepository::new(pool.clone()),
            pool,
            window_cap,
        }
    }
}

#[async_trait]
impl HistoryStore for PgHistoryStore {
    async fn kpi_row(&self, day: NaiveDate) -> Result<Option<DailyKpiRow>> {
        self.kpi.get(day).await
    }

    async fn kpi_history(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<DailyKpiRow>> {
        self.kpi.range(from, to).await
    }

    async fn recent_values(&self, kpi: Kpi, limit: usize) -> Result<Vec<(NaiveDate, Decimal)>> {
        self.baselines.recent(kpi, limit).await
    }

    async fn commit_day(&self, row: &DailyKpiRow, verdicts: &[AnomalyVerdict]) -> Result<()> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        // Serializes runs of this pipeline; released at commit or rollback.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(RUN_LOCK_KEY)
            .execute(&mut *tx)
            .await
            .context("Failed to take the run lock")?;

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
        .execute(&mut *tx)
        .await
        .context("Failed to upsert daily KPI row")?;

        for kpi in Kpi::ALL {
            sqlx::query(
                r"
                INSERT INTO baseline_values (kpi, day, value)
                VALUES ($1, $2, $3)
                ON CONFLICT (kpi, day) DO UPDATE SET value = EXCLUDED.value
                ",
            )
            .bind(kpi.as_str())
            .bind(row.day)
            .bind(row.value_of(kpi))
            .execute(&mut *tx)
            .await
            .context("Failed to append baseline value")?;

            sqlx::query(
                r"
                DELETE FROM baseline_values
                WHERE kpi = $1 AND day NOT IN (
                    SELECT day FROM baseline_values
                    WHERE kpi = $1
                    ORDER BY day DESC
                    LIMIT $2
                )
                ",
            )
            .bind(kpi.as_str())
            .bind(i64::try_from(self.window_cap).unwrap_or(i64::MAX))
            .execute(&mut *tx)
            .await
            .context("Failed to prune baseline window")?;
        }

        for verdict in verdicts {
            sqlx::query(
                r"
                INSERT INTO anomaly_verdicts
                (day, kpi, observed, baseline_mean, baseline_std_dev, score, severity, reason)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                ON CONFLICT (day, kpi) DO UPDATE
                SET observed = EXCLUDED.observed,
                    baseline_mean = EXCLUDED.baseline_mean,
                    baseline_std_dev = EXCLUDED.baseline_std_dev,
                    score = EXCLUDED.score,
                    severity = EXCLUDED.severity,
                    reason = EXCLUDED.reason
                ",
            )
            .bind(verdict.day)
            .bind(verdict.kpi.as_str())
            .bind(verdict.observed)
            .bind(verdict.baseline_mean)
            .bind(verdict.baseline_std_dev)
            .bind(verdict.score)
            .bind(verdict.severity.as_str())
            .bind(&verdict.reason)
            .execute(&mut *tx)
            .await
            .context("Failed to upsert verdict")?;
        }

        tx.commit().await.context("Failed to commit the day")?;
        Ok(())
    }
}
