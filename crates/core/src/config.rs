use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::kpi::ThresholdPolicy;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub detection: DetectionConfig,
    pub feed: FeedConfig,
    pub report: ReportConfig,
    pub scheduler: SchedulerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Shared token checked against the X-OPS-TOKEN request header.
    pub auth_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    /// Bounded connection wait; a stuck store must fail the run, not hang it.
    pub acquire_timeout_secs: u64,
}

/// Tunables of the rolling-baseline anomaly detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Rolling window capacity N.
    pub window_size: usize,
    /// Minimum prior days before a verdict is produced.
    pub min_window: usize,
    /// |z| at or above this is WATCH.
    pub watch_threshold: f64,
    /// |z| at or above this is ANOMALY.
    pub anomaly_threshold: f64,
    /// Fixed reporting timezone used for day bucketing (IANA name).
    pub timezone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    pub orders_csv: String,
    pub items_csv: Option<String>,
    pub payments_csv: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Daily metrics CSV the report rows are appended to.
    pub csv_path: Option<String>,
    pub webhook_url: Option<String>,
    pub webhook_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub enabled: bool,
    pub cron_schedule: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 5001,
                auth_token: "change-me".to_string(),
            },
            database: DatabaseConfig {
                url: "postgresql://localhost/ops_insight".to_string(),
                max_connections: 10,
                acquire_timeout_secs: 10,
            },
            detection: DetectionConfig::default(),
            feed: FeedConfig {
                orders_csv: "data/olist_orders_dataset.csv".to_string(),
                items_csv: Some("data/olist_order_items_dataset.csv".to_string()),
                payments_csv: Some("data/olist_order_payments_dataset.csv".to_string()),
            },
            report: ReportConfig {
                csv_path: Some("data/daily_ops_metrics.csv".to_string()),
                webhook_url: None,
                webhook_timeout_secs: 8,
            },
            scheduler: SchedulerConfig {
                enabled: false,
                cron_schedule: "0 0 6 * * *".to_string(),
            },
        }
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            window_size: 7,
            min_window: 3,
            watch_threshold: 1.5,
            anomaly_threshold: 3.0,
            timezone: "UTC".to_string(),
        }
    }
}

impl DetectionConfig {
    /// Fails fast on unusable settings, before any record processing.
    ///
    /// # Errors
    /// Returns `PipelineError::Config` naming the offending field.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.window_size == 0 {
            return Err(PipelineError::Config("window_size must be at least 1".to_string()));
        }
        if self.min_window == 0 || self.min_window > self.window_size {
            return Err(PipelineError::Config(format!(
                "min_window must be in 1..={} (got {})",
                self.window_size, self.min_window
            )));
        }
        if !self.thresholds().is_valid() {
            return Err(PipelineError::Config(format!(
                "thresholds must satisfy 0 < watch < anomaly (got watch={}, anomaly={})",
                self.watch_threshold, self.anomaly_threshold
            )));
        }
        self.tz()?;
        Ok(())
    }

    #[must_use]
    pub const fn thresholds(&self) -> ThresholdPolicy {
        ThresholdPolicy { watch: self.watch_threshold, anomaly: self.anomaly_threshold }
    }

    /// Parses the configured reporting timezone.
    ///
    /// # Errors
    /// Returns `PipelineError::Config` if the IANA name is unknown.
    pub fn tz(&self) -> Result<Tz, PipelineError> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| PipelineError::Config(format!("unknown timezone '{}'", self.timezone)))
    }
}
