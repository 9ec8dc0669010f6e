//! Database repositories for the daily ops anomaly engine.
//!
//! Each repository provides typed access to one table; the transactional
//! per-day commit that spans all three lives in [`crate::store`].

pub mod baseline_repo;
pub mod kpi_repo;
pub mod verdict_repo;

pub use baseline_repo::BaselineRepository;
pub use kpi_repo::DailyKpiRepository;
pub use verdict_repo::VerdictRepository;
