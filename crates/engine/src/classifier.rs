//! Anomaly Classifier: one day's KPI value against its baseline window.

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::baseline::BaselineWindow;
use ops_insight_core::{AnomalyVerdict, Kpi, Severity, ThresholdPolicy};

/// Classifies an observed KPI value against its baseline window.
///
/// The window must exclude the day under evaluation. Three regimes:
/// - below the minimum window size the verdict is INSUFFICIENT_DATA,
///   never a silent NORMAL;
/// - a zero-variance baseline classifies binary: equal to the mean is
///   NORMAL, anything else is ANOMALY;
/// - otherwise the z-score runs through the threshold policy.
#[must_use]
pub fn classify(
    day: NaiveDate,
    kpi: Kpi,
    observed: Decimal,
    window: &BaselineWindow,
    policy: &ThresholdPolicy,
    min_window: usize,
) -> AnomalyVerdict {
    let mean = window.mean();
    let std_dev = window.std_dev();

    if window.len() < min_window {
        return AnomalyVerdict {
            day,
            kpi,
            observed,
            baseline_mean: mean,
            baseline_std_dev: std_dev,
            score: None,
            severity: Severity::InsufficientData,
            reason: format!(
                "only {} of {} required baseline days",
                window.len(),
                min_window
            ),
        };
    }

    if window.is_constant() {
        // All prior values identical: no graceful degrees of deviation.
        let flat = window.values()[0];
        let (severity, reason) = if observed == flat {
            (
                Severity::Normal,
                format!("{} matches the flat {}-day baseline at {}", kpi.as_str(), window.len(), flat),
            )
        } else {
            let word = if observed < flat { "drop" } else { "spike" };
            (
                Severity::Anomaly,
                format!(
                    "{} deviates from a zero-variance {}-day baseline of {} ({})",
                    kpi.as_str(),
                    window.len(),
                    flat,
                    word
                ),
            )
        };
        return AnomalyVerdict {
            day,
            kpi,
            observed,
            baseline_mean: mean,
            baseline_std_dev: 0.0,
            score: None,
            severity,
            reason,
        };
    }

    let observed_f = observed.to_f64().unwrap_or(0.0);
    let score = (observed_f - mean) / std_dev;
    let severity = policy.severity(score);
    let reason = describe(kpi, observed_f, mean, score, window.len());

    AnomalyVerdict {
        day,
        kpi,
        observed,
        baseline_mean: mean,
        baseline_std_dev: std_dev,
        score: Some(score),
        severity,
        reason,
    }
}

fn describe(kpi: Kpi, observed: f64, mean: f64, score: f64, window_len: usize) -> String {
    if score == 0.0 {
        return format!("{} matches the {window_len}-day mean (z=+0.00)", kpi.as_str());
    }
    let word = if score < 0.0 { "drop" } else { "spike" };
    // Non-negative KPIs cannot have a zero mean with nonzero variance, but
    // guard the percentage anyway.
    if mean.abs() < f64::EPSILON {
        return format!("{} {word} vs {window_len}-day mean of 0 (z={score:+.2})", kpi.as_str());
    }
    let pct = (observed - mean) / mean * 100.0;
    format!("{} {pct:+.1}% vs {window_len}-day mean ({word}, z={score:+.2})", kpi.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2017, 1, 12).unwrap()
    }

    fn policy() -> ThresholdPolicy {
        ThresholdPolicy::default()
    }

    #[test]
    fn below_minimum_window_is_insufficient_regardless_of_value() {
        let window = BaselineWindow::new(vec![dec!(1000), dec!(1010)]);
        for observed in [dec!(0), dec!(1005), dec!(1000000)] {
            let verdict = classify(day(), Kpi::Revenue, observed, &window, &policy(), 3);
            assert_eq!(verdict.severity, Severity::InsufficientData);
            assert!(verdict.score.is_none());
            assert!(verdict.reason.contains("only 2 of 3"));
        }
    }

    #[test]
    fn zero_variance_baseline_classifies_binary() {
        let window = BaselineWindow::new(vec![dec!(100), dec!(100), dec!(100)]);
        let normal = classify(day(), Kpi::OrdersCount, dec!(100), &window, &policy(), 3);
        assert_eq!(normal.severity, Severity::Normal);
        assert!(normal.score.is_none());

        let anomaly = classify(day(), Kpi::OrdersCount, dec!(150), &window, &policy(), 3);
        assert_eq!(anomaly.severity, Severity::Anomaly);
        assert!(anomaly.reason.contains("zero-variance"));
        assert!(anomaly.reason.contains("spike"));
    }

    #[test]
    fn revenue_collapse_is_an_anomaly_with_drop_reason() {
        let window = BaselineWindow::new(vec![
            dec!(1000),
            dec!(1050),
            dec!(980),
            dec!(1020),
            dec!(990),
            dec!(1010),
            dec!(1005),
        ]);
        let verdict = classify(day(), Kpi::Revenue, dec!(800), &window, &policy(), 3);
        assert_eq!(verdict.severity, Severity::Anomaly);
        let score = verdict.score.unwrap();
        assert!(score < -8.0, "score was {score}");
        assert!(verdict.reason.contains("drop"));
        assert!((verdict.baseline_mean - 1007.857).abs() < 0.01);
    }

    #[test]
    fn small_wobble_is_normal() {
        let window = BaselineWindow::new(vec![dec!(1000), dec!(1050), dec!(980), dec!(1020)]);
        let verdict = classify(day(), Kpi::Revenue, dec!(1015), &window, &policy(), 3);
        assert_eq!(verdict.severity, Severity::Normal);
    }

    #[test]
    fn moderate_deviation_lands_in_watch() {
        // mean 100, sample std 10 over [90, 100, 110]; observed 115 -> z = 1.5
        let window = BaselineWindow::new(vec![dec!(90), dec!(100), dec!(110)]);
        let verdict = classify(day(), Kpi::OrdersCount, dec!(115), &window, &policy(), 3);
        assert_eq!(verdict.severity, Severity::Watch);
        assert!(verdict.reason.contains("spike"));
    }

    #[test]
    fn cancellation_spike_reports_spike_direction() {
        let window = BaselineWindow::new(vec![dec!(1), dec!(2), dec!(1), dec!(2), dec!(2)]);
        let verdict = classify(day(), Kpi::Cancellations, dec!(9), &window, &policy(), 3);
        assert_eq!(verdict.severity, Severity::Anomaly);
        assert!(verdict.reason.contains("spike"));
        assert!(verdict.score.unwrap() > 3.0);
    }

    #[test]
    fn severity_is_symmetric_in_magnitude() {
        let window = BaselineWindow::new(vec![dec!(90), dec!(100), dec!(110)]);
        let up = classify(day(), Kpi::Revenue, dec!(120), &window, &policy(), 3);
        let down = classify(day(), Kpi::Revenue, dec!(80), &window, &policy(), 3);
        assert_eq!(up.severity, down.severity);
    }
}
