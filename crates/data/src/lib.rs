//! Storage and I/O adapters for the daily ops anomaly engine.
//!
//! This crate provides:
//! - Database client for `PostgreSQL`
//! - Repositories for KPI rows, baseline windows, and verdicts
//! - The transactional [`PgHistoryStore`] behind the engine's store trait
//! - CSV feed reader for raw order/item/payment records
//! - CSV export and webhook delivery of the daily report row

pub mod csv_feed;
pub mod csv_storage;
pub mod database;
pub mod repositories;
pub mod store;
pub mod webhook_sink;

pub use csv_feed::CsvRecordFeed;
pub use csv_storage::{CsvMetricsExport, CsvReportSink};
pub use database::DatabaseClient;
pub use repositories::{BaselineRepository, DailyKpiRepository, VerdictRepository};
pub use store::PgHistoryStore;
pub use webhook_sink::WebhookSink;
