//! Error taxonomy for the daily pipeline.
//!
//! Record-level problems are absorbed and counted by the normalizer;
//! everything in [`PipelineError`] is fatal to the current run and aborts
//! it before any partial day becomes visible.

use thiserror::Error;

/// Why a single raw record was excluded from normalization.
///
/// These are data-quality findings, not run failures: the record is
/// dropped, counted, and the run continues.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("record is missing an order identifier")]
    MissingOrderId,
    #[error("unparseable purchase timestamp '{0}'")]
    BadTimestamp(String),
    #[error("unknown order status '{0}'")]
    UnknownStatus(String),
    #[error("negative payment amount for order {0}")]
    NegativeAmount(String),
    #[error("payment references unknown order {0}")]
    OrphanPayment(String),
}

/// Failures that abort the whole run.
///
/// The variant names the failed stage so every aborted run carries a clear
/// diagnostic; no partial `DailyKpiRow` or verdict writes survive any of
/// these.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("feed failure: {source}")]
    Feed {
        #[source]
        source: anyhow::Error,
    },
    #[error("storage failure during {stage}: {source}")]
    Storage {
        stage: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("report sink '{sink}' failed: {source}")]
    Sink {
        sink: String,
        #[source]
        source: anyhow::Error,
    },
}
