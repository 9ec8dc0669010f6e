use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use ops_insight_core::{AnomalyVerdict, DailyKpiRow};
use ops_insight_engine::DailyPipeline;

use crate::server::AppState;

const TOKEN_HEADER: &str = "x-ops-token";

#[derive(Serialize)]
pub struct HealthResponse {
    pub ok: bool,
}

#[derive(Deserialize)]
pub struct RunQuery {
    /// Target day; defaults to yesterday in the reporting timezone.
    pub date: Option<NaiveDate>,
}

#[derive(Serialize)]
pub struct RunResponse {
    pub date: NaiveDate,
    pub status: &'static str,
    pub signals_count: usize,
    pub summary: String,
}

#[derive(Serialize)]
pub struct ReportResponse {
    pub row: DailyKpiRow,
    pub verdicts: Vec<AnomalyVerdict>,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { ok: true })
}

pub(crate) fn token_ok(headers: &HeaderMap, expected: &str) -> bool {
    headers
        .get(TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|token| token == expected)
}

pub(crate) fn yesterday_in(tz: Tz) -> NaiveDate {
    let today = Utc::now().with_timezone(&tz).date_naive();
    today.pred_opt().unwrap_or(today)
}

/// Triggers one daily run.
///
/// # Errors
/// Returns 401 for a bad token, 500 with the stage diagnostic if the run
/// fails.
pub async fn run(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<RunQuery>,
) -> Result<Json<RunResponse>, (StatusCode, String)> {
    if !token_ok(&headers, &state.auth_token) {
        return Err((StatusCode::UNAUTHORIZED, "unauthorized".to_string()));
    }

    let target_day = match query.date {
        Some(date) => date,
        None => {
            let tz = state
                .detection
                .tz()
                .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
            yesterday_in(tz)
        }
    };

    let pipeline = DailyPipeline::new(
        state.detection.clone(),
        state.feed.clone(),
        state.store.clone(),
        state.sinks.clone(),
    )
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let report = pipeline
        .run_daily(target_day)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(Json(RunResponse {
        date: report.row.day,
        status: report.status.as_str(),
        signals_count: report.signal_count(),
        summary: report.summary,
    }))
}

/// Returns the stored KPI row and verdicts for one day.
///
/// # Errors
/// Returns 404 if the day has not been committed, 500 on storage failure.
pub async fn report(
    State(state): State<Arc<AppState>>,
    Path(date): Path<NaiveDate>,
) -> Result<Json<ReportResponse>, (StatusCode, String)> {
    let row = state
        .kpi
        .get(date)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("no KPI row for {date}")))?;

    let verdicts = state
        .verdicts
        .for_day(date)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(Json(ReportResponse { row, verdicts }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn token_check_requires_exact_match() {
        let mut headers = HeaderMap::new();
        assert!(!token_ok(&headers, "secret"));

        headers.insert(TOKEN_HEADER, HeaderValue::from_static("wrong"));
        assert!(!token_ok(&headers, "secret"));

        headers.insert(TOKEN_HEADER, HeaderValue::from_static("secret"));
        assert!(token_ok(&headers, "secret"));
    }

    #[test]
    fn yesterday_is_one_day_back() {
        let tz: Tz = "UTC".parse().unwrap();
        let yesterday = yesterday_in(tz);
        let today = Utc::now().date_naive();
        assert_eq!(today.signed_duration_since(yesterday).num_days(), 1);
    }
}
