//! Raw feed records and the canonical order fact.
//!
//! Raw rows arrive schema-flexible from the ingestion feed (CSV or
//! otherwise); all validation and reshaping happens in the normalizer,
//! which produces the strict [`OrderFact`] consumed by aggregation.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One raw order row as delivered by the input feed.
///
/// `purchase_ts` is kept as the feed's string form; parsing it (and
/// attributing the order to a reporting-timezone day) is the normalizer's
/// job, not the feed's.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawOrderRecord {
    pub order_id: String,
    pub status: String,
    pub purchase_ts: String,
    /// Delivery timestamp, informational only.
    pub delivered_ts: Option<String>,
}

/// One raw payment row. Orders without a payment row get revenue 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawPaymentRecord {
    pub order_id: String,
    pub amount: Decimal,
}

/// One raw order-item row. Informational for the four KPIs; carried so the
/// items-based revenue audit column can be derived for exports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawItemRecord {
    pub order_id: String,
    pub price: Decimal,
    pub freight: Decimal,
}

/// A batch of raw records for one day or date range.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawBatch {
    pub orders: Vec<RawOrderRecord>,
    pub payments: Vec<RawPaymentRecord>,
    pub items: Vec<RawItemRecord>,
}

impl RawBatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

/// Canonical order status.
///
/// Only `Completed` and `Cancelled` affect the defined KPIs; `Refunded` and
/// `Pending` still count toward daily order volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Completed,
    Cancelled,
    Refunded,
    Pending,
}

impl OrderStatus {
    /// Maps a raw feed status to the canonical enum.
    ///
    /// The alias table covers the Olist-style feed: fulfillment stages map
    /// to `Completed`, `unavailable` counts as a cancellation, `created`
    /// and `approved` are still in flight. Unknown strings return `None`
    /// and the record is excluded upstream.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "completed" | "delivered" | "shipped" | "invoiced" | "processing" => {
                Some(Self::Completed)
            }
            "cancelled" | "canceled" | "unavailable" => Some(Self::Cancelled),
            "refunded" => Some(Self::Refunded),
            "pending" | "created" | "approved" => Some(Self::Pending),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Refunded => "refunded",
            Self::Pending => "pending",
        }
    }
}

/// Canonical per-order fact. Immutable once created; discarded after the
/// owning day's aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderFact {
    pub order_id: String,
    /// Calendar day in the reporting timezone.
    pub day: NaiveDate,
    /// Non-negative; 0 when the order has no payment record.
    pub revenue: Decimal,
    pub status: OrderStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_aliases_map_to_canonical() {
        assert_eq!(OrderStatus::parse("delivered"), Some(OrderStatus::Completed));
        assert_eq!(OrderStatus::parse("shipped"), Some(OrderStatus::Completed));
        assert_eq!(OrderStatus::parse("canceled"), Some(OrderStatus::Cancelled));
        assert_eq!(OrderStatus::parse("unavailable"), Some(OrderStatus::Cancelled));
        assert_eq!(OrderStatus::parse("created"), Some(OrderStatus::Pending));
        assert_eq!(OrderStatus::parse("refunded"), Some(OrderStatus::Refunded));
    }

    #[test]
    fn status_parse_is_case_insensitive() {
        assert_eq!(OrderStatus::parse(" Delivered "), Some(OrderStatus::Completed));
        assert_eq!(OrderStatus::parse("CANCELED"), Some(OrderStatus::Cancelled));
    }

    #[test]
    fn unknown_status_is_rejected() {
        assert_eq!(OrderStatus::parse("teleported"), None);
        assert_eq!(OrderStatus::parse(""), None);
    }
}
