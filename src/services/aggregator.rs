use futures::future::join_all;
use serde::Serialize;
use std::future::Future;

use crate::error::{DashboardError, Result};
use crate::models::Order;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceReport {
    pub name: String,
    pub ok: bool,
    pub error: Option<String>,
}

/// A source's value, or its default when the source failed.
#[derive(Debug, Clone)]
pub struct Sourced<T> {
    pub value: T,
    pub report: SourceReport,
}

impl<T> Sourced<T> {
    pub fn into_parts(self) -> (T, SourceReport) {
        (self.value, self.report)
    }
}

/// Awaits one source and substitutes `default` if it fails. Failures are logged, not returned.
pub async fn degrade<T, F>(name: &str, source: F, default: T) -> Sourced<T>
where
    F: Future<Output = Result<T>>,
{
    match source.await {
        Ok(value) => Sourced {
            value,
            report: SourceReport {
                name: name.to_string(),
                ok: true,
                error: None,
            },
        },
        Err(err) => {
            tracing::warn!(source = %name, error = %err, "Data source failed, using default");
            Sourced {
                value: default,
                report: SourceReport {
                    name: name.to_string(),
                    ok: false,
                    error: Some(err.to_string()),
                },
            }
        }
    }
}

/// Starts every source at once and waits for all of them. Output order matches input order
/// no matter which source settles first.
pub async fn aggregate<T, F, I>(sources: I, default: T) -> Vec<Sourced<T>>
where
    T: Clone,
    F: Future<Output = Result<T>>,
    I: IntoIterator<Item = (String, F)>,
{
    let pending = sources.into_iter().map(|(name, source)| {
        let default = default.clone();
        async move { degrade(&name, source, default).await }
    });
    join_all(pending).await
}

/// Fails only when every source failed.
pub fn ensure_any_succeeded(scope: &str, reports: &[SourceReport]) -> Result<()> {
    if reports.is_empty() || reports.iter().any(|report| report.ok) {
        return Ok(());
    }
    Err(DashboardError::AllSourcesFailed {
        scope: scope.to_string(),
        failures: reports
            .iter()
            .map(|report| match &report.error {
                Some(error) => format!("{}: {}", report.name, error),
                None => report.name.clone(),
            })
            .collect(),
    })
}

/// The `limit` most recent orders, newest first.
pub fn recent_orders(orders: &[Order], limit: usize) -> Vec<Order> {
    let mut sorted = orders.to_vec();
    sorted.sort_by(|a, b| b.placed_at.cmp(&a.placed_at));
    sorted.truncate(limit);
    sorted
}

pub fn failed_sources(reports: &[SourceReport]) -> Vec<&str> {
    reports
        .iter()
        .filter(|report| !report.ok)
        .map(|report| report.name.as_str())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OrderStatus;
    use chrono::{TimeZone, Utc};
    use futures::future::BoxFuture;
    use std::time::Duration;
    use tokio::time::{sleep, Instant};

    fn source(delay_ms: u64, outcome: Result<Vec<u32>>) -> BoxFuture<'static, Result<Vec<u32>>> {
        Box::pin(async move {
            sleep(Duration::from_millis(delay_ms)).await;
            outcome
        })
    }

    fn unavailable() -> DashboardError {
        DashboardError::Status {
            status: 500,
            body: "down".to_string(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn one_failing_source_degrades_to_default() {
        let results = aggregate(
            vec![
                ("orders".to_string(), source(30, Ok(vec![1, 2]))),
                ("users".to_string(), source(10, Err(unavailable()))),
                ("meals".to_string(), source(20, Ok(vec![3]))),
            ],
            Vec::new(),
        )
        .await;

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].value, vec![1, 2]);
        assert!(results[1].value.is_empty());
        assert!(!results[1].report.ok);
        assert_eq!(results[1].report.error.as_deref(), Some("Server error 500: down"));
        assert_eq!(results[2].value, vec![3]);

        let reports: Vec<SourceReport> = results.into_iter().map(|r| r.report).collect();
        assert!(ensure_any_succeeded("admin", &reports).is_ok());
        assert_eq!(failed_sources(&reports), vec!["users"]);
    }

    #[tokio::test(start_paused = true)]
    async fn sources_run_concurrently() {
        let started = Instant::now();
        let results = aggregate(
            (0..4).map(|i| (format!("source-{}", i), source(1_000, Ok(vec![i])))),
            Vec::new(),
        )
        .await;

        assert_eq!(results.len(), 4);
        assert!(started.elapsed() < Duration::from_millis(1_500));
    }

    #[tokio::test]
    async fn all_sources_failing_is_an_error() {
        let results = aggregate(
            vec![
                ("orders".to_string(), source(0, Err(unavailable()))),
                ("users".to_string(), source(0, Err(unavailable()))),
            ],
            Vec::new(),
        )
        .await;
        let reports: Vec<SourceReport> = results.into_iter().map(|r| r.report).collect();

        match ensure_any_succeeded("admin", &reports) {
            Err(DashboardError::AllSourcesFailed { scope, failures }) => {
                assert_eq!(scope, "admin");
                assert_eq!(failures.len(), 2);
                assert!(failures[0].starts_with("orders: "));
            }
            other => panic!("expected AllSourcesFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn degrade_keeps_heterogeneous_defaults() {
        let stats = degrade("stats", async { Err::<u32, _>(unavailable()) }, 0).await;
        assert_eq!(stats.value, 0);
        let (names, report) = degrade("names", async { Ok(vec!["a"]) }, Vec::new()).await.into_parts();
        assert_eq!(names, vec!["a"]);
        assert!(report.ok);
    }

    #[test]
    fn recent_orders_are_newest_first() {
        let at = |day| Order {
            id: Some(format!("o{}", day)),
            meal_name: None,
            customer_email: None,
            chef_email: None,
            chef_id: None,
            quantity: None,
            amount: 1.0,
            status: OrderStatus::Pending,
            placed_at: Utc.with_ymd_and_hms(2026, 1, day, 0, 0, 0).unwrap(),
            has_timestamp: true,
        };
        let orders = vec![at(3), at(9), at(1), at(7)];

        let recent = recent_orders(&orders, 2);
        let ids: Vec<_> = recent.iter().filter_map(|o| o.id.as_deref()).collect();
        assert_eq!(ids, vec!["o9", "o7"]);
        assert_eq!(recent_orders(&orders, 10).len(), 4);
    }
}
