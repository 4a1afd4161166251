use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;

use crate::models::{MonthlyBucket, MonthlyDataPoint, Order, OrderStatus, SpendingPoint, StatusSlice};
use crate::utils::{month_label, month_start_before};

pub const DEFAULT_MONTHS_BACK: u32 = 6;

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Empty buckets for the `months_back` calendar months ending with the month of `now`,
/// oldest first.
pub fn seed_months(months_back: u32, now: DateTime<Utc>) -> Vec<MonthlyBucket> {
    (0..months_back)
        .rev()
        .filter_map(|offset| month_start_before(now, offset))
        .map(|date| MonthlyBucket {
            month: month_label(&date),
            orders: 0,
            revenue: 0.0,
        })
        .collect()
}

fn label_index(buckets: &[MonthlyBucket]) -> HashMap<String, usize> {
    buckets
        .iter()
        .enumerate()
        .map(|(i, bucket)| (bucket.month.clone(), i))
        .collect()
}

/// Counts orders and sums their amounts per month. Orders outside the window are dropped.
pub fn bucket_by_month(orders: &[Order], months_back: u32, now: DateTime<Utc>) -> Vec<MonthlyBucket> {
    let mut buckets = seed_months(months_back, now);
    let index = label_index(&buckets);

    for order in orders {
        if let Some(&i) = index.get(&month_label(&order.placed_at)) {
            buckets[i].orders += 1;
            buckets[i].revenue += order.amount;
        }
    }

    for bucket in buckets.iter_mut() {
        bucket.revenue = round_cents(bucket.revenue);
    }
    buckets
}

/// Accepts `"Mar 2026"`, `"March 2026"` and `"2026-03"` style month names.
pub fn normalize_month_label(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let candidates = [
        (format!("{}-01", raw), "%Y-%m-%d"),
        (format!("1 {}", raw), "%d %b %Y"),
        (format!("1 {}", raw), "%d %B %Y"),
    ];
    candidates
        .iter()
        .find_map(|(value, fmt)| NaiveDate::parse_from_str(value, fmt).ok())
        .map(|date| month_label(&date))
}

/// Lays server-computed monthly figures onto the pre-seeded window.
pub fn align_monthly_data(
    points: &[MonthlyDataPoint],
    months_back: u32,
    now: DateTime<Utc>,
) -> Vec<MonthlyBucket> {
    let mut buckets = seed_months(months_back, now);
    let index = label_index(&buckets);

    for point in points {
        let Some(label) = normalize_month_label(&point.month) else {
            tracing::debug!(month = %point.month, "Skipping monthly data point with unknown month");
            continue;
        };
        if let Some(&i) = index.get(&label) {
            buckets[i].orders += point.orders.max(0.0).round() as u64;
            buckets[i].revenue = round_cents(buckets[i].revenue + point.revenue.max(0.0));
        }
    }
    buckets
}

pub fn spending_trend(buckets: &[MonthlyBucket]) -> Vec<SpendingPoint> {
    buckets
        .iter()
        .map(|bucket| SpendingPoint {
            month: bucket.month.clone(),
            spending: bucket.revenue,
        })
        .collect()
}

/// One slice per known status with at least one order; never a zero slice.
pub fn status_distribution(orders: &[Order]) -> Vec<StatusSlice> {
    OrderStatus::KNOWN
        .iter()
        .filter_map(|status| {
            let value = orders.iter().filter(|order| order.status == *status).count() as u64;
            (value > 0).then(|| StatusSlice {
                name: status.as_str().to_string(),
                value,
            })
        })
        .collect()
}

/// Orders with `status` placed in the current month and in the month before it.
pub fn status_counts_by_month(orders: &[Order], status: OrderStatus, now: DateTime<Utc>) -> (u64, u64) {
    let current = month_label(&now);
    let previous = month_start_before(now, 1).map(|date| month_label(&date));

    orders
        .iter()
        .filter(|order| order.status == status)
        .fold((0, 0), |(cur, prev), order| {
            let label = month_label(&order.placed_at);
            if label == current {
                (cur + 1, prev)
            } else if previous.as_deref() == Some(label.as_str()) {
                (cur, prev + 1)
            } else {
                (cur, prev)
            }
        })
}
