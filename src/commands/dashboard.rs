use chrono::{DateTime, Utc};

use crate::api::DashboardApi;
use crate::error::Result;
use crate::models::{
    AdminStats, ChartData, ChefStats, DashboardScope, MetricsSnapshot, Order, OrderStatus, Role,
    TrendSnapshot, ViewModel,
};
use crate::services::aggregator::{degrade, ensure_any_succeeded, recent_orders, SourceReport};
use crate::services::chart::{
    align_monthly_data, bucket_by_month, spending_trend, status_counts_by_month, status_distribution,
    DEFAULT_MONTHS_BACK,
};
use crate::services::normalizer::{normalize_orders, normalize_users};
use crate::services::trend::{monthly_trends, round_trend, trend};

pub const ADMIN_RECENT_LIMIT: usize = 10;
pub const RECENT_LIMIT: usize = 5;

/// One aggregation cycle's result: the view model plus how each source fared.
#[derive(Debug, Clone)]
pub struct DashboardCycle {
    pub view: ViewModel,
    pub sources: Vec<SourceReport>,
}

pub async fn build_dashboard(
    api: &dyn DashboardApi,
    scope: &DashboardScope,
    now: DateTime<Utc>,
) -> Result<DashboardCycle> {
    match scope {
        DashboardScope::Admin => build_admin_dashboard(api, now).await,
        DashboardScope::Chef(email) => build_chef_dashboard(api, email, now).await,
        DashboardScope::User(email) => build_user_dashboard(api, email, now).await,
    }
}

pub async fn build_admin_dashboard(api: &dyn DashboardApi, now: DateTime<Utc>) -> Result<DashboardCycle> {
    let (stats, orders, users, monthly) = tokio::join!(
        degrade("admin stats", api.admin_stats(), AdminStats::default()),
        degrade("orders", api.orders(), Vec::new()),
        degrade("users", api.users(), Vec::new()),
        degrade("monthly data", api.admin_monthly_data(), Vec::new()),
    );
    let (stats, stats_report) = stats.into_parts();
    let (orders, orders_report) = orders.into_parts();
    let (users, users_report) = users.into_parts();
    let (monthly, monthly_report) = monthly.into_parts();

    let use_server_months = monthly_report.ok && !monthly.is_empty();
    let sources = vec![stats_report, orders_report, users_report, monthly_report];
    ensure_any_succeeded("admin", &sources)?;

    let orders = normalize_orders(&orders, now);
    let users = normalize_users(&users);
    let chefs: Vec<_> = users.iter().filter(|user| user.is_chef()).collect();
    let active_chefs = chefs.iter().filter(|chef| chef.is_active()).count();

    let mut metrics = MetricsSnapshot::new();
    metrics.insert("totalUsers".into(), prefer(users.len() as f64, stats.total_users));
    metrics.insert("totalChefs".into(), prefer(chefs.len() as f64, stats.total_chefs));
    metrics.insert("activeChefs".into(), prefer(active_chefs as f64, stats.active_chefs));
    metrics.insert("totalOrders".into(), prefer(orders.len() as f64, stats.total_orders));
    metrics.insert("totalRevenue".into(), prefer(total_amount(&orders), stats.total_revenue));
    metrics.insert(
        "pendingOrders".into(),
        prefer(count_status(&orders, OrderStatus::Pending), stats.pending_orders),
    );
    metrics.insert(
        "deliveredOrders".into(),
        prefer(count_status(&orders, OrderStatus::Delivered), stats.delivered_orders),
    );

    let monthly_orders = if use_server_months {
        align_monthly_data(&monthly, DEFAULT_MONTHS_BACK, now)
    } else {
        bucket_by_month(&orders, DEFAULT_MONTHS_BACK, now)
    };

    let mut trends = monthly_trends(&monthly_orders, "totalRevenue");
    trends.extend(status_trends(&orders, now));

    Ok(DashboardCycle {
        view: ViewModel {
            role: Role::Admin,
            metrics,
            trends,
            chart_data: ChartData {
                spending_trend: spending_trend(&monthly_orders),
                orders_by_status: status_distribution(&orders),
                monthly_orders,
            },
            recent_orders: recent_orders(&orders, ADMIN_RECENT_LIMIT),
        },
        sources,
    })
}

pub async fn build_chef_dashboard(
    api: &dyn DashboardApi,
    email: &str,
    now: DateTime<Utc>,
) -> Result<DashboardCycle> {
    let (stats, meals, orders) = tokio::join!(
        degrade("chef stats", api.chef_stats(email), ChefStats::default()),
        degrade("meals", api.meals_by_chef(email), Vec::new()),
        degrade("orders", api.orders(), Vec::new()),
    );
    let (stats, stats_report) = stats.into_parts();
    let (meals, meals_report) = meals.into_parts();
    let (orders, orders_report) = orders.into_parts();

    let sources = vec![stats_report, meals_report, orders_report];
    ensure_any_succeeded("chef", &sources)?;

    let orders: Vec<Order> = normalize_orders(&orders, now)
        .into_iter()
        .filter(|order| belongs_to_chef(order, email))
        .collect();

    let mut metrics = MetricsSnapshot::new();
    metrics.insert("totalMeals".into(), prefer(meals.len() as f64, stats.total_meals));
    metrics.insert("totalOrders".into(), prefer(orders.len() as f64, stats.total_orders));
    metrics.insert(
        "pendingOrders".into(),
        prefer(count_status(&orders, OrderStatus::Pending), stats.pending_orders),
    );
    metrics.insert(
        "deliveredOrders".into(),
        prefer(count_status(&orders, OrderStatus::Delivered), stats.delivered_orders),
    );
    metrics.insert("totalEarnings".into(), prefer(total_amount(&orders), stats.total_earnings));

    Ok(DashboardCycle {
        view: assemble(Role::Chef, metrics, &orders, "totalEarnings", now),
        sources,
    })
}

pub async fn build_user_dashboard(
    api: &dyn DashboardApi,
    email: &str,
    now: DateTime<Utc>,
) -> Result<DashboardCycle> {
    let (orders, reviews, favorites) = tokio::join!(
        degrade("orders", api.user_orders(email), Vec::new()),
        degrade("reviews", api.user_reviews(email), Vec::new()),
        degrade("favorites", api.user_favorites(email), Vec::new()),
    );
    let (orders, orders_report) = orders.into_parts();
    let (reviews, reviews_report) = reviews.into_parts();
    let (favorites, favorites_report) = favorites.into_parts();

    let sources = vec![orders_report, reviews_report, favorites_report];
    ensure_any_succeeded("user", &sources)?;

    let orders = normalize_orders(&orders, now);

    let mut metrics = MetricsSnapshot::new();
    metrics.insert("totalOrders".into(), orders.len() as f64);
    metrics.insert("totalSpent".into(), total_amount(&orders));
    metrics.insert("pendingOrders".into(), count_status(&orders, OrderStatus::Pending));
    metrics.insert("deliveredOrders".into(), count_status(&orders, OrderStatus::Delivered));
    metrics.insert("totalReviews".into(), reviews.len() as f64);
    metrics.insert("favoriteMeals".into(), favorites.len() as f64);

    Ok(DashboardCycle {
        view: assemble(Role::User, metrics, &orders, "totalSpent", now),
        sources,
    })
}

fn assemble(
    role: Role,
    metrics: MetricsSnapshot,
    orders: &[Order],
    revenue_key: &str,
    now: DateTime<Utc>,
) -> ViewModel {
    let monthly_orders = bucket_by_month(orders, DEFAULT_MONTHS_BACK, now);
    let mut trends = monthly_trends(&monthly_orders, revenue_key);
    trends.extend(status_trends(orders, now));

    ViewModel {
        role,
        metrics,
        trends,
        chart_data: ChartData {
            spending_trend: spending_trend(&monthly_orders),
            orders_by_status: status_distribution(orders),
            monthly_orders,
        },
        recent_orders: recent_orders(orders, RECENT_LIMIT),
    }
}

fn status_trends(orders: &[Order], now: DateTime<Utc>) -> TrendSnapshot {
    let mut trends = TrendSnapshot::new();
    for (key, status) in [
        ("pendingOrders", OrderStatus::Pending),
        ("deliveredOrders", OrderStatus::Delivered),
    ] {
        let (current, previous) = status_counts_by_month(orders, status, now);
        trends.insert(key.to_string(), round_trend(trend(current as f64, previous as f64)));
    }
    trends
}

fn belongs_to_chef(order: &Order, email: &str) -> bool {
    [order.chef_email.as_deref(), order.chef_id.as_deref()]
        .into_iter()
        .flatten()
        .any(|value| value.eq_ignore_ascii_case(email))
}

fn prefer(computed: f64, reported: f64) -> f64 {
    if computed > 0.0 {
        computed
    } else {
        reported
    }
}

fn total_amount(orders: &[Order]) -> f64 {
    let total: f64 = orders.iter().map(|order| order.amount).sum();
    (total * 100.0).round() / 100.0
}

fn count_status(orders: &[Order], status: OrderStatus) -> f64 {
    orders.iter().filter(|order| order.status == status).count() as f64
}
