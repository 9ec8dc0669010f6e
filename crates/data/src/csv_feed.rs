//! CSV-backed record feed.
//!
//! Reads the Olist-style order/item/payment exports. The feed does no
//! schema validation beyond what it needs for range filtering; malformed
//! timestamps pass through so the normalizer can count them.

use std::collections::HashSet;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::warn;

use ops_insight_core::{
    FeedConfig, RawBatch, RawItemRecord, RawOrderRecord, RawPaymentRecord, RecordFeed,
};

#[derive(Debug, Deserialize)]
struct OrderRow {
    order_id: String,
    order_status: String,
    order_purchase_timestamp: String,
    #[serde(default)]
    order_delivered_customer_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PaymentRow {
    order_id: String,
    payment_value: Decimal,
}

#[derive(Debug, Deserialize)]
struct ItemRow {
    order_id: String,
    price: Decimal,
    freight_value: Decimal,
}

/// Record feed over the three CSV exports named in [`FeedConfig`].
pub struct CsvRecordFeed {
    config: FeedConfig,
}

impl CsvRecordFeed {
    #[must_use]
    pub const fn new(config: FeedConfig) -> Self {
        Self { config }
    }

    fn read_orders(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<RawOrderRecord>> {
        let mut reader = csv::Reader::from_path(&self.config.orders_csv)
            .with_context(|| format!("Failed to open orders CSV: {}", self.config.orders_csv))?;

        // Exact day bucketing happens in the normalizer under the reporting
        // timezone; filter here with a day of slack on both ends.
        let lo = from.pred_opt().unwrap_or(from);
        let hi = to.succ_opt().unwrap_or(to);

        let mut orders = Vec::new();
        for row in reader.deserialize::<OrderRow>() {
            let row = match row {
                Ok(row) => row,
                Err(e) => {
                    warn!(error = %e, "skipping unreadable order row");
                    continue;
                }
            };
            if let Some(date) = naive_date_of(&row.order_purchase_timestamp) {
                if date < lo || date > hi {
                    continue;
                }
            }
            orders.push(RawOrderRecord {
                order_id: row.order_id,
                status: row.order_status,
                purchase_ts: row.order_purchase_timestamp,
                delivered_ts: row.order_delivered_customer_date.filter(|s| !s.is_empty()),
            });
        }
        Ok(orders)
    }

    fn read_payments(&self, keep: &HashSet<&str>) -> Result<Vec<RawPaymentRecord>> {
        let Some(path) = &self.config.payments_csv else {
            return Ok(Vec::new());
        };
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("Failed to open payments CSV: {path}"))?;

        let mut payments = Vec::new();
        for row in reader.deserialize::<PaymentRow>() {
            let row = match row {
                Ok(row) => row,
                Err(e) => {
                    warn!(error = %e, "skipping unreadable payment row");
                    continue;
                }
            };
            if keep.contains(row.order_id.as_str()) {
                payments.push(RawPaymentRecord { order_id: row.order_id, amount: row.payment_value });
            }
        }
        Ok(payments)
    }

    fn read_items(&self, keep: &HashSet<&str>) -> Result<Vec<RawItemRecord>> {
        let Some(path) = &self.config.items_csv else {
            return Ok(Vec::new());
        };
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("Failed to open items CSV: {path}"))?;

        let mut items = Vec::new();
        for row in reader.deserialize::<ItemRow>() {
            let row = match row {
                Ok(row) => row,
                Err(e) => {
                    warn!(error = %e, "skipping unreadable item row");
                    continue;
                }
            };
            if keep.contains(row.order_id.as_str()) {
                items.push(RawItemRecord {
                    order_id: row.order_id,
                    price: row.price,
                    freight: row.freight_value,
                });
            }
        }
        Ok(items)
    }
}

#[async_trait]
impl RecordFeed for CsvRecordFeed {
    async fn fetch_range(&self, from: NaiveDate, to: NaiveDate) -> Result<RawBatch> {
        let orders = self.read_orders(from, to)?;
        let ids: HashSet<&str> = orders.iter().map(|o| o.order_id.as_str()).collect();
        let payments = self.read_payments(&ids)?;
        let items = self.read_items(&ids)?;
        Ok(RawBatch { orders, payments, items })
    }
}

fn naive_date_of(raw: &str) -> Option<NaiveDate> {
    NaiveDateTime::parse_from_str(raw.trim(), "%Y-%m-%d %H:%M:%S")
        .map(|ts| ts.date())
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_csv(name: &str, contents: &str) -> String {
        let path = std::env::temp_dir().join(format!("ops_insight_{}_{name}", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path.to_string_lossy().into_owned()
    }

    fn feed(orders: &str, payments: Option<&str>) -> CsvRecordFeed {
        CsvRecordFeed::new(FeedConfig {
            orders_csv: orders.to_string(),
            items_csv: None,
            payments_csv: payments.map(str::to_string),
        })
    }

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2017, 1, day).unwrap()
    }

    #[tokio::test]
    async fn reads_orders_and_joins_payments_by_id() {
        let orders = temp_csv(
            "orders_a.csv",
            "order_id,order_status,order_purchase_timestamp,order_delivered_customer_date\n\
             o1,delivered,2017-01-12 10:00:00,2017-01-15 09:00:00\n\
             o2,canceled,2017-01-12 11:00:00,\n",
        );
        let payments = temp_csv(
            "payments_a.csv",
            "order_id,payment_value\no1,49.90\nghost,10.00\n",
        );
        let feed = feed(&orders, Some(&payments));

        let batch = feed.fetch_day(d(12)).await.unwrap();
        assert_eq!(batch.orders.len(), 2);
        // The ghost payment references an order outside the batch and is
        // dropped by the feed's inner join.
        assert_eq!(batch.payments.len(), 1);
        assert_eq!(batch.payments[0].order_id, "o1");
        assert_eq!(batch.orders[0].delivered_ts.as_deref(), Some("2017-01-15 09:00:00"));
        assert_eq!(batch.orders[1].delivered_ts, None);
    }

    #[tokio::test]
    async fn filters_orders_outside_the_range_with_slack() {
        let orders = temp_csv(
            "orders_b.csv",
            "order_id,order_status,order_purchase_timestamp,order_delivered_customer_date\n\
             in,delivered,2017-01-12 10:00:00,\n\
             edge,delivered,2017-01-13 00:30:00,\n\
             far,delivered,2017-02-20 10:00:00,\n",
        );
        let feed = feed(&orders, None);

        let batch = feed.fetch_day(d(12)).await.unwrap();
        let ids: Vec<&str> = batch.orders.iter().map(|o| o.order_id.as_str()).collect();
        // One day of slack keeps the edge row for the normalizer to bucket.
        assert_eq!(ids, vec!["in", "edge"]);
    }

    #[tokio::test]
    async fn unparseable_timestamps_pass_through() {
        let orders = temp_csv(
            "orders_c.csv",
            "order_id,order_status,order_purchase_timestamp,order_delivered_customer_date\n\
             bad,delivered,not-a-time,\n",
        );
        let feed = feed(&orders, None);

        let batch = feed.fetch_day(d(12)).await.unwrap();
        assert_eq!(batch.orders.len(), 1);
        assert_eq!(batch.orders[0].purchase_ts, "not-a-time");
    }

    #[tokio::test]
    async fn missing_orders_file_is_an_error() {
        let feed = feed("/nonexistent/orders.csv", None);
        assert!(feed.fetch_day(d(12)).await.is_err());
    }
}
