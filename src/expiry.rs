//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// This module implements the background worker that cancels GoodForDay
// orders at the daily cutoff, and the shutdown signal it waits on.
//
// | Component       | Description                                                     |
// |-----------------|-----------------------------------------------------------------|
// | ShutdownSignal  | Atomic flag + condvar pair used to stop the worker              |
// | spawn           | Launches the worker thread                                      |
// | next_cutoff_after | Next occurrence of the cutoff in local time                   |
//
// The worker recomputes its deadline against the current local time on
// every iteration, so daylight-saving transitions self-correct. On timeout
// it collects the ids of resting GoodForDay orders under one lock
// acquisition, releases, and batch-cancels under a fresh one; orders filled
// or cancelled in the gap are no-ops.
//--------------------------------------------------------------------------------------------------

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use chrono::{DateTime, Duration as ChronoDuration, Local, LocalResult, NaiveTime};
use parking_lot::{Condvar, Mutex};
use tracing::info;

use crate::matching_engine::MatchingEngine;

/// Slack added past the computed cutoff so the sweep runs strictly after it.
pub(crate) const EXPIRY_GRACE: Duration = Duration::from_millis(100);

/// Shutdown flag with a condition variable to interrupt the worker's
/// deadline wait. The flag is written with release ordering and read with
/// acquire ordering; the condvar is notified under its mutex so a wakeup
/// cannot be lost between the worker's flag check and its wait.
#[derive(Debug, Default)]
pub(crate) struct ShutdownSignal {
    flag: AtomicBool,
    lock: Mutex<()>,
    condvar: Condvar,
}

impl ShutdownSignal {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Sets the flag and wakes the worker.
    pub(crate) fn shutdown(&self) {
        self.flag.store(true, Ordering::Release);
        let _guard = self.lock.lock();
        self.condvar.notify_all();
    }

    pub(crate) fn is_shutdown(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Blocks until `deadline` or a shutdown signal. Returns `true` if the
    /// worker should exit (flag set or condvar signalled before the
    /// deadline), `false` on timeout.
    pub(crate) fn wait_until(&self, deadline: Instant) -> bool {
        let mut guard = self.lock.lock();
        if self.is_shutdown() {
            return true;
        }
        let result = self.condvar.wait_until(&mut guard, deadline);
        drop(guard);
        self.is_shutdown() || !result.timed_out()
    }
}

/// Launches the day-expiry worker for `engine`, sweeping at `cutoff` local
/// time each day.
pub(crate) fn spawn(
    engine: Arc<Mutex<MatchingEngine>>,
    shutdown: Arc<ShutdownSignal>,
    cutoff: NaiveTime,
) -> JoinHandle<()> {
    thread::Builder::new()
        .name("gfd-expiry".to_string())
        .spawn(move || run(engine, shutdown, cutoff))
        .expect("failed to spawn expiry worker thread")
}

fn run(engine: Arc<Mutex<MatchingEngine>>, shutdown: Arc<ShutdownSignal>, cutoff: NaiveTime) {
    loop {
        let deadline = next_deadline(cutoff);
        if shutdown.wait_until(deadline) {
            info!("expiry worker shutting down");
            return;
        }

        // Collect under one lock acquisition, cancel under a fresh one, so
        // the critical section stays O(n) with no per-order side effects.
        let ids = engine.lock().good_for_day_ids();
        if !ids.is_empty() {
            info!("expiring {} good-for-day orders", ids.len());
            engine.lock().cancel_orders(&ids);
        }
    }
}

/// Deadline of the next sweep: the coming local-time cutoff plus grace.
fn next_deadline(cutoff: NaiveTime) -> Instant {
    let now = Local::now();
    let target = next_cutoff_after(now, cutoff);
    let until = (target - now).to_std().unwrap_or(Duration::ZERO);
    Instant::now() + until + EXPIRY_GRACE
}

/// Returns the next occurrence of `cutoff` strictly after `now` in local
/// time. A time skipped by a clock jump resolves to the next representable
/// hour; an ambiguous time resolves to its earliest instant.
pub(crate) fn next_cutoff_after(now: DateTime<Local>, cutoff: NaiveTime) -> DateTime<Local> {
    let mut date = now.date_naive();
    if now.time() >= cutoff {
        date = date.succ_opt().unwrap_or(date);
    }
    let mut candidate = date.and_time(cutoff);
    loop {
        match candidate.and_local_timezone(Local) {
            LocalResult::Single(target) => return target,
            LocalResult::Ambiguous(earliest, _) => return earliest,
            LocalResult::None => candidate = candidate + ChronoDuration::hours(1),
        }
    }
}

//--------------------------------------------------------------------------------------------------
//  TESTS
//--------------------------------------------------------------------------------------------------
