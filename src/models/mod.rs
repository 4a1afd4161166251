use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use crate::services::loading::LoadingTier;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub api_base_url: String,
    pub refresh_interval: Option<Duration>,
    pub request_timeout: Duration,
    pub loading_tier: LoadingTier,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Chef,
    Admin,
}

impl Role {
    pub fn parse(value: &str) -> Option<Role> {
        match value.trim().to_ascii_lowercase().as_str() {
            "user" => Some(Role::User),
            "chef" => Some(Role::Chef),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::User => "user",
            Role::Chef => "chef",
            Role::Admin => "admin",
        };
        f.write_str(name)
    }
}

/// Whose dashboard is being aggregated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", content = "email", rename_all = "lowercase")]
pub enum DashboardScope {
    User(String),
    Chef(String),
    Admin,
}

impl DashboardScope {
    pub fn role(&self) -> Role {
        match self {
            DashboardScope::User(_) => Role::User,
            DashboardScope::Chef(_) => Role::Chef,
            DashboardScope::Admin => Role::Admin,
        }
    }
}

impl fmt::Display for DashboardScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DashboardScope::User(email) | DashboardScope::Chef(email) => {
                write!(f, "{} {}", self.role(), email)
            }
            DashboardScope::Admin => f.write_str("admin"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Delivered,
    Pending,
    Processing,
    Cancelled,
    Unknown,
}

impl OrderStatus {
    /// Categories that appear in the status distribution, in display order.
    pub const KNOWN: [OrderStatus; 4] = [
        OrderStatus::Delivered,
        OrderStatus::Pending,
        OrderStatus::Processing,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Delivered => "delivered",
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Unknown => "unknown",
        }
    }
}

/// An order after normalization. Raw payload shapes never get past the normalizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Option<String>,
    pub meal_name: Option<String>,
    pub customer_email: Option<String>,
    pub chef_email: Option<String>,
    pub chef_id: Option<String>,
    pub quantity: Option<f64>,
    pub amount: f64,
    pub status: OrderStatus,
    pub placed_at: DateTime<Utc>,
    /// False when no timestamp field was usable and `placed_at` fell back to "now".
    pub has_timestamp: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAccount {
    pub email: Option<String>,
    pub name: Option<String>,
    pub role: Option<Role>,
    pub status: Option<String>,
}

impl UserAccount {
    pub fn is_chef(&self) -> bool {
        self.role == Some(Role::Chef)
    }

    /// Accounts without a status are considered active.
    pub fn is_active(&self) -> bool {
        match self.status.as_deref() {
            None => true,
            Some(status) => status.eq_ignore_ascii_case("active"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AdminStats {
    #[serde(deserialize_with = "lenient_f64")]
    pub total_users: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub total_chefs: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub active_chefs: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub total_orders: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub total_revenue: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub pending_orders: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub delivered_orders: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChefStats {
    #[serde(deserialize_with = "lenient_f64")]
    pub total_meals: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub total_orders: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub pending_orders: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub delivered_orders: f64,
    #[serde(deserialize_with = "lenient_f64", alias = "totalRevenue")]
    pub total_earnings: f64,
}

/// One entry of `/admin/monthly-data`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MonthlyDataPoint {
    pub month: String,
    #[serde(deserialize_with = "lenient_f64")]
    pub orders: f64,
    #[serde(deserialize_with = "lenient_f64", alias = "earnings")]
    pub revenue: f64,
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(crate::utils::truthy_number(Some(&value)).unwrap_or(0.0))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyBucket {
    pub month: String,
    pub orders: u64,
    pub revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpendingPoint {
    pub month: String,
    pub spending: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSlice {
    pub name: String,
    pub value: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartData {
    pub monthly_orders: Vec<MonthlyBucket>,
    pub spending_trend: Vec<SpendingPoint>,
    pub orders_by_status: Vec<StatusSlice>,
}

pub type MetricsSnapshot = BTreeMap<String, f64>;
pub type TrendSnapshot = BTreeMap<String, f64>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewModel {
    pub role: Role,
    pub metrics: MetricsSnapshot,
    pub trends: TrendSnapshot,
    pub chart_data: ChartData,
    pub recent_orders: Vec<Order>,
}

/// What the presentation layer reads after every cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    pub view: Option<ViewModel>,
    pub error: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
    pub is_loading: bool,
    pub is_refreshing: bool,
}
