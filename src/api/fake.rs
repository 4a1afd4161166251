use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use super::DashboardApi;
use crate::error::{DashboardError, Result};
use crate::models::{AdminStats, ChefStats, MonthlyDataPoint};

#[derive(Debug, Clone, Default)]
pub struct FakeData {
    pub orders: Vec<Value>,
    pub users: Vec<Value>,
    pub meals: Vec<Value>,
    pub user_orders: Vec<Value>,
    pub reviews: Vec<Value>,
    pub favorites: Vec<Value>,
    pub admin_stats: AdminStats,
    pub monthly: Vec<MonthlyDataPoint>,
    pub chef_stats: ChefStats,
}

/// Scripted backend: canned payloads, per-endpoint failures and delays, call counts.
#[derive(Default)]
pub struct FakeApi {
    data: Mutex<FakeData>,
    failing: Mutex<HashSet<&'static str>>,
    delays: Mutex<HashMap<&'static str, Duration>>,
    calls: Mutex<HashMap<&'static str, usize>>,
}

pub const ALL_ENDPOINTS: [&str; 9] = [
    "orders",
    "users",
    "meals_by_chef",
    "user_orders",
    "user_reviews",
    "user_favorites",
    "admin_stats",
    "admin_monthly_data",
    "chef_stats",
];

impl FakeApi {
    pub fn new(data: FakeData) -> Self {
        FakeApi {
            data: Mutex::new(data),
            ..Default::default()
        }
    }

    pub fn update(&self, change: impl FnOnce(&mut FakeData)) {
        change(&mut self.data.lock().unwrap());
    }

    pub fn fail(&self, endpoint: &'static str) {
        self.failing.lock().unwrap().insert(endpoint);
    }

    pub fn fail_all(&self) {
        self.failing.lock().unwrap().extend(ALL_ENDPOINTS);
    }

    pub fn recover_all(&self) {
        self.failing.lock().unwrap().clear();
    }

    pub fn delay(&self, endpoint: &'static str, delay: Duration) {
        self.delays.lock().unwrap().insert(endpoint, delay);
    }

    pub fn delay_all(&self, delay: Duration) {
        let mut delays = self.delays.lock().unwrap();
        for endpoint in ALL_ENDPOINTS {
            delays.insert(endpoint, delay);
        }
    }

    pub fn calls(&self, endpoint: &'static str) -> usize {
        self.calls.lock().unwrap().get(endpoint).copied().unwrap_or(0)
    }

    async fn respond<T>(&self, endpoint: &'static str, pick: impl FnOnce(&FakeData) -> T) -> Result<T> {
        *self.calls.lock().unwrap().entry(endpoint).or_insert(0) += 1;

        let delay = self.delays.lock().unwrap().get(endpoint).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing.lock().unwrap().contains(endpoint) {
            return Err(DashboardError::Status {
                status: 503,
                body: format!("{} unavailable", endpoint),
            });
        }
        Ok(pick(&self.data.lock().unwrap()))
    }
}

#[async_trait]
impl DashboardApi for FakeApi {
    async fn orders(&self) -> Result<Vec<Value>> {
        self.respond("orders", |d| d.orders.clone()).await
    }

    async fn users(&self) -> Result<Vec<Value>> {
        self.respond("users", |d| d.users.clone()).await
    }

    async fn meals_by_chef(&self, _email: &str) -> Result<Vec<Value>> {
        self.respond("meals_by_chef", |d| d.meals.clone()).await
    }

    async fn user_orders(&self, _email: &str) -> Result<Vec<Value>> {
        self.respond("user_orders", |d| d.user_orders.clone()).await
    }

    async fn user_reviews(&self, _email: &str) -> Result<Vec<Value>> {
        self.respond("user_reviews", |d| d.reviews.clone()).await
    }

    async fn user_favorites(&self, _email: &str) -> Result<Vec<Value>> {
        self.respond("user_favorites", |d| d.favorites.clone()).await
    }

    async fn admin_stats(&self) -> Result<AdminStats> {
        self.respond("admin_stats", |d| d.admin_stats.clone()).await
    }

    async fn admin_monthly_data(&self) -> Result<Vec<MonthlyDataPoint>> {
        self.respond("admin_monthly_data", |d| d.monthly.clone()).await
    }

    async fn chef_stats(&self, _email: &str) -> Result<ChefStats> {
        self.respond("chef_stats", |d| d.chef_stats.clone()).await
    }
}
