use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::models::{Order, OrderStatus, Role, UserAccount};
use crate::utils::{parse_timestamp, text_field, truthy_number};

const TIMESTAMP_FIELDS: [&str; 3] = ["orderTime", "orderDate", "createdAt"];

/// Monetary amount of a record in major currency units.
///
/// First match wins: `paymentInfo.amount` (cents), `totalPrice`,
/// `price * quantity`, `price`, `amount`, `paymentAmount`, else `0`.
/// A field only matches when it is a non-zero number or numeric string;
/// negative values are skipped so the result is never below zero.
pub fn extract_amount(record: &Value) -> f64 {
    let positive = |value: Option<&Value>| truthy_number(value).filter(|n| *n > 0.0);

    if let Some(cents) = positive(record.get("paymentInfo").and_then(|info| info.get("amount"))) {
        return cents / 100.0;
    }
    if let Some(total) = positive(record.get("totalPrice")) {
        return total;
    }

    let price = positive(record.get("price"));
    if let (Some(price), Some(quantity)) = (price, positive(record.get("quantity"))) {
        return price * quantity;
    }
    if let Some(price) = price {
        return price;
    }

    positive(record.get("amount"))
        .or_else(|| positive(record.get("paymentAmount")))
        .unwrap_or(0.0)
}

/// Exact, case-sensitive match on `orderStatus`.
pub fn classify_status(record: &Value) -> OrderStatus {
    match record.get("orderStatus").and_then(Value::as_str) {
        Some("delivered") => OrderStatus::Delivered,
        Some("pending") => OrderStatus::Pending,
        Some("processing") => OrderStatus::Processing,
        Some("cancelled") => OrderStatus::Cancelled,
        _ => OrderStatus::Unknown,
    }
}

/// First parseable of `orderTime`, `orderDate`, `createdAt`.
pub fn record_timestamp(record: &Value) -> Option<DateTime<Utc>> {
    TIMESTAMP_FIELDS
        .iter()
        .find_map(|field| parse_timestamp(record.get(*field)))
}

/// Same chain as [`record_timestamp`], ending at `now`.
pub fn resolve_timestamp(record: &Value, now: DateTime<Utc>) -> DateTime<Utc> {
    record_timestamp(record).unwrap_or(now)
}

fn first_text(record: &Value, fields: &[&str]) -> Option<String> {
    fields.iter().find_map(|field| text_field(record.get(*field)))
}

pub fn normalize_order(record: &Value, now: DateTime<Utc>) -> Order {
    let timestamp = record_timestamp(record);
    Order {
        id: first_text(record, &["_id", "id", "orderId"]),
        meal_name: first_text(record, &["mealName", "foodName", "name"]),
        customer_email: first_text(record, &["userEmail", "customerEmail", "email"]),
        chef_email: first_text(record, &["chefEmail"]),
        chef_id: first_text(record, &["chefId"]),
        quantity: truthy_number(record.get("quantity")),
        amount: extract_amount(record),
        status: classify_status(record),
        placed_at: timestamp.unwrap_or(now),
        has_timestamp: timestamp.is_some(),
    }
}

pub fn normalize_orders(records: &[Value], now: DateTime<Utc>) -> Vec<Order> {
    records.iter().map(|record| normalize_order(record, now)).collect()
}

pub fn normalize_user(record: &Value) -> UserAccount {
    UserAccount {
        email: first_text(record, &["email"]),
        name: first_text(record, &["displayName", "name"]),
        role: record
            .get("role")
            .and_then(Value::as_str)
            .and_then(Role::parse),
        status: first_text(record, &["status"]),
    }
}

pub fn normalize_users(records: &[Value]) -> Vec<UserAccount> {
    records.iter().map(normalize_user).collect()
}
