//! Periodic background tasks.
//!
//! The poll loop and the decay loop each run on their own interval. A tick
//! that fires while the previous run is still going is skipped, never queued.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::dispatch::Dispatcher;
use crate::lifecycle::DecayClock;

/// Marks a task type as running.
#[derive(Debug, Default, Clone)]
pub struct BusyFlag {
    busy: Arc<AtomicBool>,
}

impl BusyFlag {
    /// Create an idle flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the flag, or `None` if a run is already active.
    pub fn try_acquire(&self) -> Option<BusyGuard> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyGuard {
                busy: Arc::clone(&self.busy),
            })
    }

    /// Whether a run is active.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Releases its [`BusyFlag`] when dropped.
#[derive(Debug)]
pub struct BusyGuard {
    busy: Arc<AtomicBool>,
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

fn minutes(mins: u64) -> Duration {
    Duration::from_secs(mins.saturating_mul(60))
}

/// Run poll cycles every `every`.
pub async fn run_poll_loop(dispatcher: Arc<Dispatcher>, every: Duration, busy: BusyFlag) {
    info!("Feed poller started (interval: {} seconds)", every.as_secs());

    let mut timer = interval(every);
    timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        timer.tick().await;
        let Some(_guard) = busy.try_acquire() else {
            debug!("Previous poll still running, skipping tick");
            continue;
        };
        dispatcher.run_cycle().await;
    }
}

/// Run decay checks every `every`.
pub async fn run_decay_loop(clock: Arc<DecayClock>, every: Duration, busy: BusyFlag) {
    info!("Decay clock started (interval: {} seconds)", every.as_secs());

    let mut timer = interval(every);
    timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        timer.tick().await;
        let Some(_guard) = busy.try_acquire() else {
            debug!("Previous decay check still running, skipping tick");
            continue;
        };
        if let Err(e) = clock.check().await {
            error!("Decay check failed: {}", e);
        }
    }
}

/// Spawn the poll loop with an interval in minutes.
pub fn start_poller(dispatcher: Arc<Dispatcher>, interval_mins: u64) -> JoinHandle<()> {
    tokio::spawn(run_poll_loop(dispatcher, minutes(interval_mins), BusyFlag::new()))
}

/// Spawn the decay loop with an interval in minutes.
pub fn start_decay_clock(clock: Arc<DecayClock>, interval_mins: u64) -> JoinHandle<()> {
    tokio::spawn(run_decay_loop(clock, minutes(interval_mins), BusyFlag::new()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_busy_flag_single_holder() {
        let flag = BusyFlag::new();
        assert!(!flag.is_busy());

        let guard = flag.try_acquire().unwrap();
        assert!(flag.is_busy());
        assert!(flag.try_acquire().is_none());

        drop(guard);
        assert!(!flag.is_busy());
        assert!(flag.try_acquire().is_some());
    }

    #[test]
    fn test_busy_flag_shared_between_clones() {
        let flag = BusyFlag::new();
        let other = flag.clone();
        let _guard = flag.try_acquire().unwrap();
        assert!(other.is_busy());
        assert!(other.try_acquire().is_none());
    }

    #[test]
    fn test_minutes() {
        assert_eq!(minutes(10), Duration::from_secs(600));
    }
}
