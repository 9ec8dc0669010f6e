//! Record Normalizer: raw order/item/payment rows into canonical facts.
//!
//! All schema flexibility stops at this boundary. Bad records are excluded
//! and counted, never fatal; duplicates resolve last-write-wins with a
//! data-quality warning.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use rust_decimal::Decimal;
use tracing::warn;

use ops_insight_core::{OrderFact, OrderStatus, RawBatch, RecordError};

/// Outcome of normalizing one raw batch.
///
/// `facts` are keyed by order id and returned in id order, so the same
/// batch always normalizes to the same sequence.
#[derive(Debug, Clone, Default)]
pub struct NormalizedBatch {
    pub facts: Vec<OrderFact>,
    /// Records excluded for validation failures.
    pub excluded: usize,
    /// Duplicate order ids resolved last-write-wins.
    pub duplicates: usize,
    /// Payment rows referencing no known order.
    pub orphan_payments: usize,
}

/// Validating transformation from raw feed rows to [`OrderFact`] values.
pub struct RecordNormalizer {
    tz: Tz,
}

impl RecordNormalizer {
    #[must_use]
    pub const fn new(tz: Tz) -> Self {
        Self { tz }
    }

    /// Normalizes a raw batch into canonical facts.
    ///
    /// Purely a transformation: no side effects beyond data-quality logs.
    #[must_use]
    pub fn normalize(&self, batch: &RawBatch) -> NormalizedBatch {
        let mut out = NormalizedBatch::default();

        // Orders first; payments join against the surviving ids.
        let mut facts: BTreeMap<String, OrderFact> = BTreeMap::new();
        for order in &batch.orders {
            let order_id = order.order_id.trim();
            if order_id.is_empty() {
                Self::exclude(&mut out, &RecordError::MissingOrderId);
                continue;
            }
            let day = match self.day_bucket(&order.purchase_ts) {
                Some(day) => day,
                None => {
                    Self::exclude(
                        &mut out,
                        &RecordError::BadTimestamp(order.purchase_ts.clone()),
                    );
                    continue;
                }
            };
            let status = match OrderStatus::parse(&order.status) {
                Some(status) => status,
                None => {
                    Self::exclude(&mut out, &RecordError::UnknownStatus(order.status.clone()));
                    continue;
                }
            };

            let fact = OrderFact {
                order_id: order_id.to_string(),
                day,
                revenue: Decimal::ZERO,
                status,
            };
            if facts.insert(order_id.to_string(), fact).is_some() {
                out.duplicates += 1;
                warn!(order_id, "duplicate order id in batch, keeping the last occurrence");
            }
        }

        // A single order can carry several payment rows (installments);
        // revenue is their sum. Orders with no payment stay at 0.
        let mut payments: HashMap<&str, Decimal> = HashMap::new();
        for payment in &batch.payments {
            let order_id = payment.order_id.trim();
            if payment.amount < Decimal::ZERO {
                Self::exclude(&mut out, &RecordError::NegativeAmount(order_id.to_string()));
                continue;
            }
            if !facts.contains_key(order_id) {
                let why = RecordError::OrphanPayment(order_id.to_string());
                out.orphan_payments += 1;
                warn!(%why, "dropping payment row");
                continue;
            }
            *payments.entry(order_id).or_insert(Decimal::ZERO) += payment.amount;
        }
        for (order_id, total) in payments {
            if let Some(fact) = facts.get_mut(order_id) {
                fact.revenue = total;
            }
        }

        out.facts = facts.into_values().collect();
        out
    }

    fn exclude(out: &mut NormalizedBatch, why: &RecordError) {
        out.excluded += 1;
        warn!(%why, "excluding raw record");
    }

    /// Attributes a raw timestamp to exactly one reporting-timezone day.
    ///
    /// Offset-carrying timestamps (RFC 3339) are converted into the
    /// reporting timezone; naive timestamps are taken as wall time already
    /// in it, which is how the upstream feed writes them.
    fn day_bucket(&self, raw: &str) -> Option<NaiveDate> {
        let raw = raw.trim();
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Some(ts.with_timezone(&self.tz).date_naive());
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
            return self
                .tz
                .from_local_datetime(&naive)
                .earliest()
                .map(|ts| ts.date_naive());
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ops_insight_core::{RawOrderRecord, RawPaymentRecord};
    use rust_decimal_macros::dec;

    fn normalizer() -> RecordNormalizer {
        RecordNormalizer::new(chrono_tz::UTC)
    }

    fn order(id: &str, status: &str, ts: &str) -> RawOrderRecord {
        RawOrderRecord {
            order_id: id.to_string(),
            status: status.to_string(),
            purchase_ts: ts.to_string(),
            delivered_ts: None,
        }
    }

    fn payment(id: &str, amount: Decimal) -> RawPaymentRecord {
        RawPaymentRecord { order_id: id.to_string(), amount }
    }

    #[test]
    fn joins_payments_onto_orders() {
        let batch = RawBatch {
            orders: vec![order("o1", "delivered", "2017-01-12 10:00:00")],
            payments: vec![payment("o1", dec!(49.90))],
            items: vec![],
        };
        let result = normalizer().normalize(&batch);
        assert_eq!(result.facts.len(), 1);
        assert_eq!(result.facts[0].revenue, dec!(49.90));
        assert_eq!(result.facts[0].status, OrderStatus::Completed);
    }

    #[test]
    fn order_without_payment_gets_zero_revenue() {
        let batch = RawBatch {
            orders: vec![order("o1", "canceled", "2017-01-12 10:00:00")],
            payments: vec![],
            items: vec![],
        };
        let result = normalizer().normalize(&batch);
        assert_eq!(result.facts[0].revenue, Decimal::ZERO);
        assert_eq!(result.facts[0].status, OrderStatus::Cancelled);
    }

    #[test]
    fn multiple_payment_rows_sum() {
        let batch = RawBatch {
            orders: vec![order("o1", "delivered", "2017-01-12 10:00:00")],
            payments: vec![payment("o1", dec!(30)), payment("o1", dec!(20))],
            items: vec![],
        };
        let result = normalizer().normalize(&batch);
        assert_eq!(result.facts[0].revenue, dec!(50));
    }

    #[test]
    fn missing_order_id_is_excluded_and_counted() {
        let batch = RawBatch {
            orders: vec![
                order("", "delivered", "2017-01-12 10:00:00"),
                order("o2", "delivered", "2017-01-12 11:00:00"),
            ],
            payments: vec![],
            items: vec![],
        };
        let result = normalizer().normalize(&batch);
        assert_eq!(result.excluded, 1);
        assert_eq!(result.facts.len(), 1);
        assert_eq!(result.facts[0].order_id, "o2");
    }

    #[test]
    fn bad_timestamp_and_unknown_status_are_excluded() {
        let batch = RawBatch {
            orders: vec![
                order("o1", "delivered", "not-a-time"),
                order("o2", "teleported", "2017-01-12 10:00:00"),
            ],
            payments: vec![],
            items: vec![],
        };
        let result = normalizer().normalize(&batch);
        assert_eq!(result.excluded, 2);
        assert!(result.facts.is_empty());
    }

    #[test]
    fn duplicate_order_ids_resolve_last_write_wins() {
        let batch = RawBatch {
            orders: vec![
                order("o1", "pending", "2017-01-12 10:00:00"),
                order("o1", "delivered", "2017-01-12 12:00:00"),
            ],
            payments: vec![],
            items: vec![],
        };
        let result = normalizer().normalize(&batch);
        assert_eq!(result.duplicates, 1);
        assert_eq!(result.facts.len(), 1);
        assert_eq!(result.facts[0].status, OrderStatus::Completed);
    }

    #[test]
    fn orphan_payment_is_counted_not_fatal() {
        let batch = RawBatch {
            orders: vec![order("o1", "delivered", "2017-01-12 10:00:00")],
            payments: vec![payment("ghost", dec!(10))],
            items: vec![],
        };
        let result = normalizer().normalize(&batch);
        assert_eq!(result.orphan_payments, 1);
        assert_eq!(result.facts[0].revenue, Decimal::ZERO);
    }

    #[test]
    fn negative_payment_is_excluded() {
        let batch = RawBatch {
            orders: vec![order("o1", "delivered", "2017-01-12 10:00:00")],
            payments: vec![payment("o1", dec!(-5))],
            items: vec![],
        };
        let result = normalizer().normalize(&batch);
        assert_eq!(result.excluded, 1);
        assert_eq!(result.facts[0].revenue, Decimal::ZERO);
    }

    #[test]
    fn offset_timestamp_buckets_in_reporting_timezone() {
        // 01:30 UTC on Jan 13 is still Jan 12 in Sao Paulo (UTC-2 in January).
        let normalizer = RecordNormalizer::new(chrono_tz::America::Sao_Paulo);
        let batch = RawBatch {
            orders: vec![order("o1", "delivered", "2017-01-13T01:30:00+00:00")],
            payments: vec![],
            items: vec![],
        };
        let result = normalizer.normalize(&batch);
        assert_eq!(result.facts[0].day, NaiveDate::from_ymd_opt(2017, 1, 12).unwrap());
    }

    #[test]
    fn facts_come_back_in_order_id_order() {
        let batch = RawBatch {
            orders: vec![
                order("b", "delivered", "2017-01-12 10:00:00"),
                order("a", "delivered", "2017-01-12 10:00:00"),
            ],
            payments: vec![],
            items: vec![],
        };
        let result = normalizer().normalize(&batch);
        let ids: Vec<&str> = result.facts.iter().map(|f| f.order_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
