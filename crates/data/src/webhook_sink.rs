//! Webhook delivery of the daily report row.
//!
//! POSTs one JSON payload per day to a single configured consumer (an
//! automation webhook or dashboard collector). Routing beyond that one
//! endpoint is out of scope.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use tracing::info;

use ops_insight_core::{DailyReport, ReportSink};

#[derive(Debug, Serialize)]
struct SignalPayload<'a> {
    metric: &'a str,
    direction: &'a str,
    severity: &'a str,
    details: &'a str,
}

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    run_time: String,
    date: String,
    status: &'a str,
    signals_count: usize,
    signals: Vec<SignalPayload<'a>>,
    summary: &'a str,
}

fn payload_of(report: &DailyReport) -> WebhookPayload<'_> {
    let signals = report
        .signals()
        .map(|v| SignalPayload {
            metric: v.kpi.as_str(),
            direction: v.direction(),
            severity: v.severity.as_str(),
            details: v.reason.as_str(),
        })
        .collect::<Vec<_>>();

    WebhookPayload {
        run_time: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        date: report.row.day.to_string(),
        status: report.status.as_str(),
        signals_count: signals.len(),
        signals,
        summary: &report.summary,
    }
}

/// Report sink POSTing the day's payload to one webhook URL.
pub struct WebhookSink {
    client: reqwest::Client,
    url: String,
}

impl WebhookSink {
    /// Builds the sink with a bounded request timeout.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(url: String, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("Failed to build webhook HTTP client")?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl ReportSink for WebhookSink {
    fn name(&self) -> &'static str {
        "webhook"
    }

    async fn emit(&self, report: &DailyReport) -> Result<()> {
        let response = self
            .client
            .post(&self.url)
            .json(&payload_of(report))
            .send()
            .await
            .with_context(|| format!("Webhook POST to {} failed", self.url))?;

        let status = response.status();
        info!(%status, url = %self.url, "webhook delivered");
        response
            .error_for_status()
            .with_context(|| format!("Webhook {} rejected the report", self.url))?;
        Ok(())
    }
}
