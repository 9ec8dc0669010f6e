//! Daily Aggregator: canonical facts into one KPI row per day.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use ops_insight_core::{DailyKpiRow, OrderFact, OrderStatus};

/// Aggregates the facts bucketed to `day` into one [`DailyKpiRow`].
///
/// Pure and deterministic: re-running over the same fact set yields an
/// identical row, so retried daily jobs are safe.
///
/// Counting policy: `orders_count` covers every order attempted that day
/// regardless of final status (demand, not fulfillment); revenue only sums
/// completed orders; cancellations count independently and do not subtract
/// from the order count.
#[must_use]
pub fn aggregate_day(facts: &[OrderFact], day: NaiveDate) -> DailyKpiRow {
    let mut orders_count: u32 = 0;
    let mut revenue = Decimal::ZERO;
    let mut cancellations: u32 = 0;

    for fact in facts.iter().filter(|f| f.day == day) {
        orders_count = orders_count.saturating_add(1);
        match fact.status {
            OrderStatus::Completed => revenue += fact.revenue,
            OrderStatus::Cancelled => cancellations = cancellations.saturating_add(1),
            OrderStatus::Refunded | OrderStatus::Pending => {}
        }
    }

    let aov = if orders_count > 0 {
        Some((revenue / Decimal::from(orders_count)).round_dp(2))
    } else {
        None
    };

    DailyKpiRow { day, orders_count, revenue, cancellations, aov }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2017, 1, 12).unwrap()
    }

    fn fact(id: &str, status: OrderStatus, revenue: Decimal) -> OrderFact {
        OrderFact { order_id: id.to_string(), day: day(), revenue, status }
    }

    #[test]
    fn aggregates_the_three_order_day() {
        // o1 completed $50, o2 cancelled $0, o3 completed $30
        let facts = vec![
            fact("o1", OrderStatus::Completed, dec!(50)),
            fact("o2", OrderStatus::Cancelled, dec!(0)),
            fact("o3", OrderStatus::Completed, dec!(30)),
        ];
        let row = aggregate_day(&facts, day());
        assert_eq!(row.orders_count, 3);
        assert_eq!(row.revenue, dec!(80));
        assert_eq!(row.cancellations, 1);
        assert_eq!(row.aov, Some(dec!(26.67)));
    }

    #[test]
    fn empty_day_has_no_aov() {
        let row = aggregate_day(&[], day());
        assert_eq!(row.orders_count, 0);
        assert_eq!(row.revenue, Decimal::ZERO);
        assert_eq!(row.cancellations, 0);
        assert_eq!(row.aov, None);
    }

    #[test]
    fn aov_is_defined_iff_orders_exist() {
        let facts = vec![fact("o1", OrderStatus::Pending, dec!(0))];
        let row = aggregate_day(&facts, day());
        assert_eq!(row.orders_count, 1);
        // Pending order contributes no revenue but does define AOV.
        assert_eq!(row.aov, Some(dec!(0)));
    }

    #[test]
    fn cancelled_revenue_is_not_counted() {
        let facts = vec![
            fact("o1", OrderStatus::Cancelled, dec!(100)),
            fact("o2", OrderStatus::Refunded, dec!(40)),
            fact("o3", OrderStatus::Completed, dec!(10)),
        ];
        let row = aggregate_day(&facts, day());
        assert_eq!(row.orders_count, 3);
        assert_eq!(row.revenue, dec!(10));
        assert_eq!(row.cancellations, 1);
    }

    #[test]
    fn facts_from_other_days_are_ignored() {
        let other = NaiveDate::from_ymd_opt(2017, 1, 13).unwrap();
        let mut facts = vec![fact("o1", OrderStatus::Completed, dec!(50))];
        facts.push(OrderFact {
            order_id: "o2".to_string(),
            day: other,
            revenue: dec!(99),
            status: OrderStatus::Completed,
        });
        let row = aggregate_day(&facts, day());
        assert_eq!(row.orders_count, 1);
        assert_eq!(row.revenue, dec!(50));
    }

    #[test]
    fn aggregation_is_idempotent() {
        let facts = vec![
            fact("o1", OrderStatus::Completed, dec!(33.33)),
            fact("o2", OrderStatus::Completed, dec!(66.67)),
            fact("o3", OrderStatus::Cancelled, dec!(0)),
        ];
        let first = aggregate_day(&facts, day());
        let second = aggregate_day(&facts, day());
        assert_eq!(first, second);
        // Byte-identical through serialization as well.
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }
}
