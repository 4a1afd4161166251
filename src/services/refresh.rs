use chrono::Utc;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::api::DashboardApi;
use crate::commands::dashboard::build_dashboard;
use crate::models::{DashboardScope, DashboardSnapshot};
use crate::services::aggregator::failed_sources;
use crate::services::loading::{LoadingContext, LoadingTier, TaskRunner};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshPhase {
    Idle,
    Loading,
    Refreshing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    Applied,
    Failed(String),
    /// Another cycle was already in flight; nothing was fetched.
    Skipped,
    /// The scope changed while this cycle was running; its result was thrown away.
    Superseded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Visible,
    Silent,
}

struct ControllerState {
    phase: RefreshPhase,
    scope: DashboardScope,
    latest_cycle: u64,
}

struct Shared {
    api: Arc<dyn DashboardApi>,
    runner: TaskRunner,
    tier: LoadingTier,
    state: Mutex<ControllerState>,
    snapshot: watch::Sender<DashboardSnapshot>,
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Owns one dashboard's view model and keeps at most one aggregation cycle in flight.
///
/// Every accepted cycle gets the next sequence number. Changing the scope bumps the
/// sequence too, so a cycle that finishes after a scope change is discarded.
#[derive(Clone)]
pub struct RefreshController {
    shared: Arc<Shared>,
}

impl RefreshController {
    pub fn new(
        api: Arc<dyn DashboardApi>,
        loading: LoadingContext,
        scope: DashboardScope,
        tier: LoadingTier,
    ) -> Self {
        let (snapshot, _rx) = watch::channel(DashboardSnapshot::default());
        RefreshController {
            shared: Arc::new(Shared {
                api,
                runner: TaskRunner::new(loading),
                tier,
                state: Mutex::new(ControllerState {
                    phase: RefreshPhase::Idle,
                    scope,
                    latest_cycle: 0,
                }),
                snapshot,
            }),
        }
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        self.shared.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<DashboardSnapshot> {
        self.shared.snapshot.subscribe()
    }

    pub fn phase(&self) -> RefreshPhase {
        self.shared.state().phase
    }

    pub fn scope(&self) -> DashboardScope {
        self.shared.state().scope.clone()
    }

    /// Switches whose dashboard is shown. Any cycle in flight is superseded and the
    /// previous view model is dropped, since it belongs to another scope.
    pub fn set_scope(&self, scope: DashboardScope) {
        let mut state = self.shared.state();
        if state.scope == scope {
            return;
        }
        tracing::info!(from = %state.scope, to = %scope, "Dashboard scope changed");
        state.scope = scope;
        state.latest_cycle += 1;
        state.phase = RefreshPhase::Idle;
        self.shared.snapshot.send_replace(DashboardSnapshot::default());
    }

    /// Full refresh behind the visible busy indicator.
    pub async fn refresh_data(&self) -> RefreshOutcome {
        self.run_cycle(Mode::Visible).await
    }

    /// Background refresh; only `is_refreshing` is raised.
    pub async fn silent_refresh(&self) -> RefreshOutcome {
        self.run_cycle(Mode::Silent).await
    }

    /// Calls `silent_refresh` every `period` until the handle is dropped or stopped.
    pub fn spawn_auto_refresh(&self, period: Duration) -> AutoRefresh {
        let controller = self.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let outcome = controller.silent_refresh().await;
                tracing::debug!(?outcome, "Auto refresh tick");
            }
        });
        AutoRefresh { handle }
    }

    fn try_begin(&self, mode: Mode) -> Option<(u64, DashboardScope)> {
        let mut state = self.shared.state();
        if state.phase != RefreshPhase::Idle {
            return None;
        }
        state.phase = match mode {
            Mode::Visible => RefreshPhase::Loading,
            Mode::Silent => RefreshPhase::Refreshing,
        };
        state.latest_cycle += 1;
        self.shared.snapshot.send_modify(|snapshot| {
            snapshot.is_loading = mode == Mode::Visible;
            snapshot.is_refreshing = mode == Mode::Silent;
        });
        Some((state.latest_cycle, state.scope.clone()))
    }

    async fn run_cycle(&self, mode: Mode) -> RefreshOutcome {
        let Some((cycle, scope)) = self.try_begin(mode) else {
            tracing::debug!(?mode, "Refresh already in flight, request dropped");
            return RefreshOutcome::Skipped;
        };
        let mut guard = CycleGuard {
            shared: &self.shared,
            cycle,
            armed: true,
        };

        let work = build_dashboard(self.shared.api.as_ref(), &scope, Utc::now());
        let result = match mode {
            Mode::Visible => {
                self.shared
                    .runner
                    .run_tier(self.shared.tier, "Loading dashboard", work)
                    .await
            }
            Mode::Silent => work.await,
        };
        guard.armed = false;

        let mut state = self.shared.state();
        if state.latest_cycle != cycle {
            tracing::debug!(cycle, latest = state.latest_cycle, "Discarding superseded dashboard cycle");
            return RefreshOutcome::Superseded;
        }
        state.phase = RefreshPhase::Idle;

        match result {
            Ok(outcome) => {
                let failed = failed_sources(&outcome.sources);
                if !failed.is_empty() {
                    tracing::warn!(cycle, scope = %scope, failed = ?failed, "Dashboard built with degraded sources");
                }
                tracing::info!(cycle, scope = %scope, orders = outcome.view.recent_orders.len(), "Dashboard refreshed");
                self.shared.snapshot.send_modify(|snapshot| {
                    snapshot.view = Some(outcome.view);
                    snapshot.error = None;
                    snapshot.last_updated = Some(Utc::now());
                    snapshot.is_loading = false;
                    snapshot.is_refreshing = false;
                });
                RefreshOutcome::Applied
            }
            Err(err) => {
                tracing::error!(cycle, scope = %scope, error = %err, "Dashboard refresh failed");
                let message = err.user_message();
                self.shared.snapshot.send_modify(|snapshot| {
                    snapshot.error = Some(message.clone());
                    snapshot.is_loading = false;
                    snapshot.is_refreshing = false;
                });
                RefreshOutcome::Failed(message)
            }
        }
    }
}

/// Puts the controller back to idle if a cycle is dropped before it finishes.
struct CycleGuard<'a> {
    shared: &'a Shared,
    cycle: u64,
    armed: bool,
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = self.shared.state();
        if state.latest_cycle == self.cycle {
            state.phase = RefreshPhase::Idle;
            self.shared.snapshot.send_modify(|snapshot| {
                snapshot.is_loading = false;
                snapshot.is_refreshing = false;
            });
        }
    }
}

/// Handle to the interval task started by [`RefreshController::spawn_auto_refresh`].
pub struct AutoRefresh {
    handle: JoinHandle<()>,
}

impl AutoRefresh {
    pub fn stop(&self) {
        self.handle.abort();
    }
}

impl Drop for AutoRefresh {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
