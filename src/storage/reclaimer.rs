//! Background Reclaimer
//!
//! This module implements a background task that periodically sweeps the map
//! for expired entries and removes them. This is "active expiry" as opposed
//! to the "lazy expiry" that happens on `get`.
//!
//! ## Why Do We Need This?
//!
//! Lazy expiry is cheap, but an entry that expires and is never read again
//! would otherwise stay in memory forever. The reclaimer bounds memory for
//! write-once keys.
//!
//! ## Design
//!
//! The reclaimer runs on its own OS thread hosting a current-thread Tokio
//! runtime, so callers of the map never need a runtime of their own. The loop:
//! 1. Waits for the next interval tick, a manual trigger, or shutdown
//! 2. Upgrades its weak reference to the map (exits if the map is gone)
//! 3. Sweeps every bucket under the map's lock
//! 4. Logs how many entries were reclaimed

use super::entry::FAR_FUTURE;
use crate::error::Result;
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info};

/// Name given to the reclaimer's OS thread.
const THREAD_NAME: &str = "expiremap-reclaimer";

/// Something the reclaimer can sweep.
pub(crate) trait Sweep: Send + Sync + 'static {
    /// Removes every expired entry, returning how many were dropped.
    fn sweep(&self) -> usize;

    /// Number of entries still stored.
    fn len(&self) -> usize;
}

/// A handle to the running reclaimer.
///
/// When this handle is dropped, the reclaimer is stopped and its thread
/// joined. The map owns the handle, so dropping the map stops the sweeps.
#[derive(Debug)]
pub struct Reclaimer {
    /// Sender to signal shutdown
    shutdown_tx: watch::Sender<bool>,

    /// Wakes the loop for an out-of-schedule sweep
    trigger: Arc<Notify>,

    period: Duration,

    thread: Option<JoinHandle<()>>,
}

impl Reclaimer {
    /// Starts sweeping `target` every `period`.
    ///
    /// The first sweep happens one full period after start. Only a weak
    /// reference is kept, so the reclaimer never extends the map's lifetime.
    /// Periods longer than roughly 30 years are clamped to that.
    pub(crate) fn start(target: Weak<dyn Sweep>, period: Duration) -> Result<Self> {
        let period = period.min(FAR_FUTURE);
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let trigger = Arc::new(Notify::new());

        let loop_trigger = Arc::clone(&trigger);
        let thread = thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || {
                runtime.block_on(reclaimer_loop(target, period, loop_trigger, shutdown_rx));
            })?;

        info!(
            period_ms = period.as_millis() as u64,
            "Background reclaimer started"
        );

        Ok(Self {
            shutdown_tx,
            trigger,
            period,
            thread: Some(thread),
        })
    }

    /// Requests a sweep now instead of waiting for the next tick.
    ///
    /// The sweep still happens on the reclaimer thread; use
    /// [`ExpiringMap::purge_expired`](crate::ExpiringMap::purge_expired) to
    /// sweep synchronously.
    pub fn trigger(&self) {
        self.trigger.notify_one();
    }

    /// Stops the reclaimer.
    ///
    /// This is called automatically when the handle is dropped. A sweep
    /// already holding the map's lock runs to completion first.
    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Returns the interval between scheduled sweeps.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Returns true while the reclaimer thread is alive.
    pub fn is_running(&self) -> bool {
        self.thread
            .as_ref()
            .is_some_and(|thread| !thread.is_finished())
    }
}

impl Drop for Reclaimer {
    fn drop(&mut self) {
        self.stop();

        if let Some(thread) = self.thread.take() {
            if thread.thread().id() != thread::current().id() {
                let _ = thread.join();
            }
        }
        debug!("Background reclaimer stopped");
    }
}

/// The main reclaimer loop.
async fn reclaimer_loop(
    target: Weak<dyn Sweep>,
    period: Duration,
    trigger: Arc<Notify>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let now = time::Instant::now();
    let first = now.checked_add(period).unwrap_or(now);
    let mut ticker = time::interval_at(first, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            result = shutdown_rx.changed() => {
                if result.is_err() || *shutdown_rx.borrow() {
                    debug!("Reclaimer received shutdown signal");
                    return;
                }
                continue;
            }
            _ = ticker.tick() => {}
            _ = trigger.notified() => {}
        }

        let Some(target) = target.upgrade() else {
            debug!("Map dropped, reclaimer exiting");
            return;
        };

        let removed = target.sweep();
        if removed > 0 {
            debug!(
                removed = removed,
                remaining = target.len(),
                "Expired entries reclaimed"
            );
        }
    }
}
