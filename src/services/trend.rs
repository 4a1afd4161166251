use crate::models::{MonthlyBucket, TrendSnapshot};

/// Percentage change from `previous` to `current`.
pub fn trend(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        if current > 0.0 {
            100.0
        } else {
            0.0
        }
    } else {
        ((current - previous) / previous) * 100.0
    }
}

/// One decimal place, the precision the dashboard cards display.
pub fn round_trend(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Month-over-month trends for the order count and the revenue series,
/// taken from the last two buckets. `revenue_key` names the revenue metric
/// for the role (`totalRevenue`, `totalEarnings`, `totalSpent`).
pub fn monthly_trends(buckets: &[MonthlyBucket], revenue_key: &str) -> TrendSnapshot {
    let mut trends = TrendSnapshot::new();
    let (previous, current) = match buckets {
        [.., previous, current] => (previous, current),
        [current] => {
            trends.insert("totalOrders".to_string(), round_trend(trend(current.orders as f64, 0.0)));
            trends.insert(revenue_key.to_string(), round_trend(trend(current.revenue, 0.0)));
            return trends;
        }
        [] => return trends,
    };

    trends.insert(
        "totalOrders".to_string(),
        round_trend(trend(current.orders as f64, previous.orders as f64)),
    );
    trends.insert(
        revenue_key.to_string(),
        round_trend(trend(current.revenue, previous.revenue)),
    );
    trends
}
