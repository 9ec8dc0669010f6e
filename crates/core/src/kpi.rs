//! KPI identifiers, severity labels, and the threshold policy.
//!
//! The four KPIs tracked by the engine are fixed; severity is a total
//! function of the deviation score with the threshold ladder held as data,
//! so operators can tune it from config without touching the classifier.

use serde::{Deserialize, Serialize};

/// One of the four daily KPIs tracked by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kpi {
    OrdersCount,
    Revenue,
    Cancellations,
    Aov,
}

impl Kpi {
    /// All KPIs in reporting order.
    pub const ALL: [Self; 4] = [Self::OrdersCount, Self::Revenue, Self::Cancellations, Self::Aov];

    /// Stable identifier used as a storage key and in report rows.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OrdersCount => "orders_count",
            Self::Revenue => "revenue",
            Self::Cancellations => "cancellations",
            Self::Aov => "aov",
        }
    }

    /// Short human-readable label for summaries.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::OrdersCount => "Orders",
            Self::Revenue => "Revenue",
            Self::Cancellations => "Cancellations",
            Self::Aov => "AOV",
        }
    }

    /// Parses the stable identifier produced by [`Kpi::as_str`].
    #[must_use]
    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "orders_count" => Some(Self::OrdersCount),
            "revenue" => Some(Self::Revenue),
            "cancellations" => Some(Self::Cancellations),
            "aov" => Some(Self::Aov),
            _ => None,
        }
    }
}

/// Classification of a day's KPI value relative to its baseline.
///
/// `InsufficientData` is a first-class outcome: a window below the minimum
/// size must never be reported as `Normal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Normal,
    Watch,
    Anomaly,
    InsufficientData,
}

impl Severity {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "NORMAL",
            Self::Watch => "WATCH",
            Self::Anomaly => "ANOMALY",
            Self::InsufficientData => "INSUFFICIENT_DATA",
        }
    }

    /// True for severities that should surface as signals in reports.
    #[must_use]
    pub const fn is_signal(self) -> bool {
        matches!(self, Self::Watch | Self::Anomaly)
    }

    /// Parses the label produced by [`Severity::as_str`].
    #[must_use]
    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "NORMAL" => Some(Self::Normal),
            "WATCH" => Some(Self::Watch),
            "ANOMALY" => Some(Self::Anomaly),
            "INSUFFICIENT_DATA" => Some(Self::InsufficientData),
            _ => None,
        }
    }
}

/// Z-score thresholds mapping a deviation score to a severity.
///
/// Thresholds apply to the score magnitude; direction is reported in the
/// verdict reason, not the severity. Per-KPI overrides are deliberately not
/// supported here.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ThresholdPolicy {
    /// |score| at or above this is at least WATCH.
    pub watch: f64,
    /// |score| at or above this is ANOMALY.
    pub anomaly: f64,
}

impl Default for ThresholdPolicy {
    fn default() -> Self {
        Self { watch: 1.5, anomaly: 3.0 }
    }
}

impl ThresholdPolicy {
    /// Maps a deviation score to a severity. Total over all finite scores.
    #[must_use]
    pub fn severity(&self, score: f64) -> Severity {
        let magnitude = score.abs();
        // Ladder is ordered most severe first; first rung reached wins.
        let ladder = [(self.anomaly, Severity::Anomaly), (self.watch, Severity::Watch)];
        for (bound, severity) in ladder {
            if magnitude >= bound {
                return severity;
            }
        }
        Severity::Normal
    }

    /// Checks the ladder is usable: positive rungs, watch strictly below anomaly.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.watch > 0.0 && self.anomaly > 0.0 && self.watch < self.anomaly
    }
}
