//! Baseline Tracker: per-KPI sliding windows over recent daily values.
//!
//! Strictly a sliding window over the most recently *recorded* values, not
//! a calendar-gap-tolerant one: skipped days simply mean the window spans
//! more calendar days. Durable persistence of appends happens in the same
//! transaction as the day's KPI row; this tracker is the in-run view.

use std::collections::{HashMap, VecDeque};

use anyhow::Result;
use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::warn;

use ops_insight_core::{HistoryStore, Kpi};

/// Read-only snapshot of one KPI's window, excluding the evaluation day.
#[derive(Debug, Clone, PartialEq)]
pub struct BaselineWindow {
    values: Vec<Decimal>,
}

impl BaselineWindow {
    #[must_use]
    pub fn new(values: Vec<Decimal>) -> Self {
        Self { values }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn values(&self) -> &[Decimal] {
        &self.values
    }

    /// Arithmetic mean of the window values; 0.0 for an empty window.
    #[must_use]
    pub fn mean(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.values.iter().map(|v| v.to_f64().unwrap_or(0.0)).sum();
        sum / self.values.len() as f64
    }

    /// Sample standard deviation (N-1 denominator).
    ///
    /// A single-point window has no observed variance and returns 0.0; the
    /// classifier treats that case specially rather than dividing by it.
    #[must_use]
    pub fn std_dev(&self) -> f64 {
        if self.values.len() <= 1 {
            return 0.0;
        }
        let mean = self.mean();
        let sum_sq: f64 = self
            .values
            .iter()
            .map(|v| {
                let d = v.to_f64().unwrap_or(0.0) - mean;
                d * d
            })
            .sum();
        (sum_sq / (self.values.len() - 1) as f64).sqrt()
    }

    /// True when every window value is identical (zero-variance baseline).
    #[must_use]
    pub fn is_constant(&self) -> bool {
        match self.values.first() {
            Some(first) => self.values.iter().all(|v| v == first),
            None => false,
        }
    }
}

/// Per-KPI FIFO windows of the N most recently recorded daily values.
#[derive(Debug)]
pub struct BaselineTracker {
    cap: usize,
    windows: HashMap<Kpi, VecDeque<(NaiveDate, Decimal)>>,
}

impl BaselineTracker {
    #[must_use]
    pub fn new(cap: usize) -> Self {
        Self { cap, windows: HashMap::new() }
    }

    /// Seeds every KPI's window from the durable store, oldest first.
    ///
    /// # Errors
    /// Propagates storage failures unchanged.
    pub async fn seed(store: &dyn HistoryStore, cap: usize) -> Result<Self> {
        let mut tracker = Self::new(cap);
        for kpi in Kpi::ALL {
            let values = store.recent_values(kpi, cap).await?;
            tracker.windows.insert(kpi, values.into_iter().collect());
        }
        Ok(tracker)
    }

    /// Snapshot of the window for `kpi`, excluding any value for the day
    /// under evaluation (callers record a day only after classifying it).
    #[must_use]
    pub fn current(&self, kpi: Kpi) -> BaselineWindow {
        let values = self
            .windows
            .get(&kpi)
            .map(|w| w.iter().map(|(_, v)| *v).collect())
            .unwrap_or_default();
        BaselineWindow::new(values)
    }

    /// Appends a day's value, evicting the chronologically oldest entry
    /// once the window exceeds capacity.
    ///
    /// Appends must arrive in calendar order; a replayed day replaces its
    /// previous value and an out-of-order day is dropped with a warning
    /// rather than corrupting the FIFO order.
    pub fn record(&mut self, kpi: Kpi, day: NaiveDate, value: Decimal) {
        let window = self.windows.entry(kpi).or_default();
        match window.back_mut() {
            Some((last, slot)) if *last == day => {
                *slot = value;
            }
            Some((last, _)) if *last > day => {
                warn!(kpi = kpi.as_str(), %day, "dropping out-of-order baseline append");
                return;
            }
            _ => window.push_back((day, value)),
        }
        while window.len() > self.cap {
            window.pop_front();
        }
    }

    /// Most recently recorded day for a KPI, if any.
    #[must_use]
    pub fn last_day(&self, kpi: Kpi) -> Option<NaiveDate> {
        self.windows.get(&kpi).and_then(|w| w.back()).map(|(day, _)| *day)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2017, 1, day).unwrap()
    }

    #[test]
    fn window_never_exceeds_capacity() {
        let mut tracker = BaselineTracker::new(7);
        for day in 1..=20 {
            tracker.record(Kpi::Revenue, d(day), Decimal::from(day));
        }
        assert_eq!(tracker.current(Kpi::Revenue).len(), 7);
    }

    #[test]
    fn eviction_removes_the_oldest() {
        let mut tracker = BaselineTracker::new(3);
        for day in 1..=4 {
            tracker.record(Kpi::OrdersCount, d(day), Decimal::from(day * 10));
        }
        let window = tracker.current(Kpi::OrdersCount);
        assert_eq!(window.values(), &[dec!(20), dec!(30), dec!(40)]);
    }

    #[test]
    fn replayed_day_replaces_its_value() {
        let mut tracker = BaselineTracker::new(7);
        tracker.record(Kpi::Revenue, d(1), dec!(100));
        tracker.record(Kpi::Revenue, d(1), dec!(120));
        let window = tracker.current(Kpi::Revenue);
        assert_eq!(window.values(), &[dec!(120)]);
    }

    #[test]
    fn out_of_order_append_is_dropped() {
        let mut tracker = BaselineTracker::new(7);
        tracker.record(Kpi::Revenue, d(5), dec!(100));
        tracker.record(Kpi::Revenue, d(3), dec!(50));
        let window = tracker.current(Kpi::Revenue);
        assert_eq!(window.values(), &[dec!(100)]);
        assert_eq!(tracker.last_day(Kpi::Revenue), Some(d(5)));
    }

    #[test]
    fn mean_and_sample_std_dev() {
        let window = BaselineWindow::new(vec![
            dec!(1000),
            dec!(1050),
            dec!(980),
            dec!(1020),
            dec!(990),
            dec!(1010),
            dec!(1005),
        ]);
        assert!((window.mean() - 1007.857).abs() < 0.01);
        assert!((window.std_dev() - 22.704).abs() < 0.01);
    }

    #[test]
    fn single_point_window_has_zero_std_dev() {
        let window = BaselineWindow::new(vec![dec!(42)]);
        assert!((window.std_dev() - 0.0).abs() < f64::EPSILON);
        assert!(window.is_constant());
    }

    #[test]
    fn constant_window_is_detected_exactly() {
        let window = BaselineWindow::new(vec![dec!(100), dec!(100), dec!(100)]);
        assert!(window.is_constant());
        let varied = BaselineWindow::new(vec![dec!(100), dec!(100.01), dec!(100)]);
        assert!(!varied.is_constant());
    }

    #[test]
    fn empty_window_is_not_constant() {
        assert!(!BaselineWindow::new(vec![]).is_constant());
        assert!((BaselineWindow::new(vec![]).mean() - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn windows_are_independent_per_kpi() {
        let mut tracker = BaselineTracker::new(7);
        tracker.record(Kpi::Revenue, d(1), dec!(1000));
        tracker.record(Kpi::Cancellations, d(1), dec!(2));
        assert_eq!(tracker.current(Kpi::Revenue).len(), 1);
        assert_eq!(tracker.current(Kpi::Cancellations).len(), 1);
        assert_eq!(tracker.current(Kpi::Aov).len(), 0);
    }
}
