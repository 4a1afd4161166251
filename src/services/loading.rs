use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};

pub const QUICK_TIMEOUT: Duration = Duration::from_millis(2_000);
pub const STANDARD_TIMEOUT: Duration = Duration::from_millis(5_000);
pub const EXTENDED_TIMEOUT: Duration = Duration::from_millis(10_000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadingTier {
    Quick,
    #[default]
    Standard,
    Extended,
}

impl LoadingTier {
    pub fn parse(value: &str) -> Option<LoadingTier> {
        match value.trim().to_ascii_lowercase().as_str() {
            "quick" => Some(LoadingTier::Quick),
            "standard" => Some(LoadingTier::Standard),
            "extended" => Some(LoadingTier::Extended),
            _ => None,
        }
    }

    pub fn max_duration(&self) -> Duration {
        match self {
            LoadingTier::Quick => QUICK_TIMEOUT,
            LoadingTier::Standard => STANDARD_TIMEOUT,
            LoadingTier::Extended => EXTENDED_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadingStatus {
    pub busy: bool,
    pub label: Option<String>,
    pub started_at: Option<Instant>,
}

struct Slot {
    generation: u64,
    timer: Option<JoinHandle<()>>,
}

struct Inner {
    tx: watch::Sender<LoadingStatus>,
    slot: Mutex<Slot>,
}

impl Inner {
    fn slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// The single busy indicator shared by everything under one root.
///
/// Cloning yields another handle to the same indicator. Every `show`/`begin`
/// opens a new generation; timers and finished tasks only clear the indicator
/// while their generation is still the latest one. `hide` always clears.
#[derive(Clone)]
pub struct LoadingContext {
    inner: Arc<Inner>,
}

impl LoadingContext {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(LoadingStatus::default());
        LoadingContext {
            inner: Arc::new(Inner {
                tx,
                slot: Mutex::new(Slot {
                    generation: 0,
                    timer: None,
                }),
            }),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<LoadingStatus> {
        self.inner.tx.subscribe()
    }

    pub fn status(&self) -> LoadingStatus {
        self.inner.tx.borrow().clone()
    }

    pub fn is_busy(&self) -> bool {
        self.inner.tx.borrow().busy
    }

    /// Marks the indicator busy and arms a timer that clears it after `max`.
    /// Outside a Tokio runtime no timer is armed and only `hide` clears it.
    pub fn show(&self, label: &str, max: Duration) -> u64 {
        let mut slot = self.inner.slot();
        let generation = self.open(&mut slot, label);

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(label = %label, "No runtime, loading indicator will not auto-clear");
            return generation;
        };
        let inner = Arc::clone(&self.inner);
        let label = label.to_string();
        slot.timer = Some(runtime.spawn(async move {
            sleep(max).await;
            let mut slot = inner.slot();
            if slot.generation == generation {
                tracing::warn!(label = %label, timeout_ms = max.as_millis() as u64, "Loading indicator timed out");
                slot.timer = None;
                inner.tx.send_replace(LoadingStatus::default());
            }
        }));
        generation
    }

    pub fn hide(&self) {
        let mut slot = self.inner.slot();
        slot.generation += 1;
        if let Some(timer) = slot.timer.take() {
            timer.abort();
        }
        self.inner.tx.send_replace(LoadingStatus::default());
    }

    /// Opens a generation without a timer; the caller owns the deadline.
    fn begin(&self, label: &str) -> u64 {
        let mut slot = self.inner.slot();
        self.open(&mut slot, label)
    }

    fn hide_if(&self, generation: u64) -> bool {
        let mut slot = self.inner.slot();
        if slot.generation != generation {
            return false;
        }
        slot.generation += 1;
        if let Some(timer) = slot.timer.take() {
            timer.abort();
        }
        self.inner.tx.send_replace(LoadingStatus::default());
        true
    }

    fn open(&self, slot: &mut Slot, label: &str) -> u64 {
        slot.generation += 1;
        if let Some(timer) = slot.timer.take() {
            timer.abort();
        }
        self.inner.tx.send_replace(LoadingStatus {
            busy: true,
            label: Some(label.to_string()),
            started_at: Some(Instant::now()),
        });
        slot.generation
    }
}

impl Default for LoadingContext {
    fn default() -> Self {
        Self::new()
    }
}

struct HideOnDrop<'a> {
    loading: &'a LoadingContext,
    generation: u64,
}

impl Drop for HideOnDrop<'_> {
    fn drop(&mut self) {
        self.loading.hide_if(self.generation);
    }
}

/// Runs work behind the busy indicator with a hard upper bound on how long
/// the indicator stays up. The work itself is never cut short by the bound.
#[derive(Clone)]
pub struct TaskRunner {
    loading: LoadingContext,
}

impl TaskRunner {
    pub fn new(loading: LoadingContext) -> Self {
        TaskRunner { loading }
    }

    pub fn loading(&self) -> &LoadingContext {
        &self.loading
    }

    pub async fn run<F, T>(&self, label: &str, max: Duration, operation: F) -> T
    where
        F: Future<Output = T>,
    {
        let generation = self.loading.begin(label);
        let _guard = HideOnDrop {
            loading: &self.loading,
            generation,
        };

        tokio::pin!(operation);
        tokio::select! {
            output = &mut operation => return output,
            _ = sleep(max) => {
                if self.loading.hide_if(generation) {
                    tracing::warn!(label = %label, timeout_ms = max.as_millis() as u64, "Loading indicator timed out, operation continues");
                }
            }
        }
        operation.await
    }

    pub async fn run_tier<F, T>(&self, tier: LoadingTier, label: &str, operation: F) -> T
    where
        F: Future<Output = T>,
    {
        self.run(label, tier.max_duration(), operation).await
    }

    pub async fn quick<F, T>(&self, label: &str, operation: F) -> T
    where
        F: Future<Output = T>,
    {
        self.run(label, QUICK_TIMEOUT, operation).await
    }

    pub async fn standard<F, T>(&self, label: &str, operation: F) -> T
    where
        F: Future<Output = T>,
    {
        self.run(label, STANDARD_TIMEOUT, operation).await
    }

    pub async fn extended<F, T>(&self, label: &str, operation: F) -> T
    where
        F: Future<Output = T>,
    {
        self.run(label, EXTENDED_TIMEOUT, operation).await
    }

    /// Manual region for work that spans several awaits. Auto-clears after `max`
    /// when called inside a Tokio runtime.
    pub fn start(&self, label: &str, max: Duration) -> u64 {
        self.loading.show(label, max)
    }

    /// Clears the indicator, whoever raised it.
    pub fn stop(&self) {
        self.loading.hide();
    }
}
