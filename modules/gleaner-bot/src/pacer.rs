use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::Notify;
use tracing::debug;

/// Last-known account state, carried alongside the countdown so an operator
/// (or a test) can see what the bot believes about itself while it sleeps.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccountStats {
    pub name: String,
    pub karma: i64,
    pub recent_scores: Vec<i64>,
}

/// Point-in-time view of the pacer.
#[derive(Debug, Clone, PartialEq)]
pub struct PacerSnapshot {
    pub remaining: Duration,
    pub waiting: bool,
    pub account: AccountStats,
}

/// Cancellable countdown behind every deliberate sleep: inter-post pacing,
/// rate-limit cooldowns and the cycle pause. The remaining time is held as
/// observable state instead of being drawn as a progress bar.
///
/// Cancellation is sticky: once cancelled, the current wait and every future
/// wait return immediately.
pub struct Pacer {
    tick: Duration,
    remaining_ms: AtomicU64,
    waiting: AtomicBool,
    cancelled: AtomicBool,
    notify: Notify,
    account: Mutex<AccountStats>,
}

impl Pacer {
    pub fn new() -> Self {
        Self::with_tick(Duration::from_secs(1))
    }

    /// Tick granularity only affects how often the countdown updates and how
    /// quickly a missed cancel notification is noticed; tests use
    /// millisecond ticks.
    pub fn with_tick(tick: Duration) -> Self {
        Self {
            tick: tick.max(Duration::from_millis(1)),
            remaining_ms: AtomicU64::new(0),
            waiting: AtomicBool::new(false),
            cancelled: AtomicBool::new(false),
            notify: Notify::new(),
            account: Mutex::new(AccountStats::default()),
        }
    }

    /// Sleep for `duration`, counting down one tick at a time. Returns false
    /// when the wait was cut short (or never started) because of `cancel`.
    pub async fn wait(&self, duration: Duration) -> bool {
        if self.cancelled.load(Ordering::SeqCst) {
            return false;
        }
        debug!(secs = duration.as_secs(), "Pacing");
        self.waiting.store(true, Ordering::SeqCst);
        self.remaining_ms
            .store(duration.as_millis() as u64, Ordering::SeqCst);

        let mut left = duration;
        let completed = loop {
            if self.cancelled.load(Ordering::SeqCst) {
                break false;
            }
            if left.is_zero() {
                break true;
            }
            let step = self.tick.min(left);
            tokio::select! {
                _ = tokio::time::sleep(step) => {
                    left = left.saturating_sub(step);
                    self.remaining_ms.store(left.as_millis() as u64, Ordering::SeqCst);
                }
                _ = self.notify.notified() => {
                    break false;
                }
            }
        };

        self.waiting.store(false, Ordering::SeqCst);
        self.remaining_ms.store(0, Ordering::SeqCst);
        completed
    }

    /// Cut short the current wait and refuse all future ones.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn set_account(&self, stats: AccountStats) {
        *self
            .account
            .lock()
            .unwrap_or_else(|poison| poison.into_inner()) = stats;
    }

    pub fn snapshot(&self) -> PacerSnapshot {
        PacerSnapshot {
            remaining: Duration::from_millis(self.remaining_ms.load(Ordering::SeqCst)),
            waiting: self.waiting.load(Ordering::SeqCst),
            account: self
                .account
                .lock()
                .unwrap_or_else(|poison| poison.into_inner())
                .clone(),
        }
    }
}

impl Default for Pacer {
    fn default() -> Self {
        Self::new()
    }
}
