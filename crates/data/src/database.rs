use std::time::Duration;

use anyhow::Result;
use sqlx::{postgres::PgPoolOptions, PgPool};

use ops_insight_core::DatabaseConfig;

pub struct DatabaseClient {
    pool: PgPool,
}

impl DatabaseClient {
    /// Creates a new database client connected to the configured `PostgreSQL` database.
    ///
    /// The acquire timeout bounds how long a run can wait for a connection;
    /// a stuck store fails the run instead of blocking the next day's.
    ///
    /// # Errors
    /// Returns an error if the database connection cannot be established.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect(&config.url)
            .await?;
        Ok(Self { pool })
    }

    /// Creates the engine's tables if they do not exist yet.
    ///
    /// # Errors
    /// Returns an error if any DDL statement fails.
    pub async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS daily_kpi (
                day DATE PRIMARY KEY,
                orders_count BIGINT NOT NULL,
                revenue NUMERIC NOT NULL,
                cancellations BIGINT NOT NULL,
                aov NUMERIC
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS baseline_values (
                kpi TEXT NOT NULL,
                day DATE NOT NULL,
                value NUMERIC NOT NULL,
                PRIMARY KEY (kpi, day)
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS anomaly_verdicts (
                day DATE NOT NULL,
                kpi TEXT NOT NULL,
                observed NUMERIC NOT NULL,
                baseline_mean DOUBLE PRECISION NOT NULL,
                baseline_std_dev DOUBLE PRECISION NOT NULL,
                score DOUBLE PRECISION,
                severity TEXT NOT NULL,
                reason TEXT NOT NULL,
                PRIMARY KEY (day, kpi)
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[must_use]
    pub fn pool(&self) -> PgPool {
        self.pool.clone()
    }
}
