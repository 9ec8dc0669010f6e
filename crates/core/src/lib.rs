pub mod config;
pub mod config_loader;
pub mod error;
pub mod kpi;
pub mod records;
pub mod report;
pub mod traits;

pub use config::{
    AppConfig, DatabaseConfig, DetectionConfig, FeedConfig, ReportConfig, SchedulerConfig,
    ServerConfig,
};
pub use config_loader::ConfigLoader;
pub use error::{PipelineError, RecordError};
pub use kpi::{Kpi, Severity, ThresholdPolicy};
pub use records::{OrderFact, OrderStatus, RawBatch, RawItemRecord, RawOrderRecord, RawPaymentRecord};
pub use report::{AnomalyVerdict, DailyKpiRow, DailyReport, RunStatus};
pub use traits::{HistoryStore, RecordFeed, ReportSink};
