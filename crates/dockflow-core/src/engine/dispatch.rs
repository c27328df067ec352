//! Task dispatch over independent work units.
//!
//! The dispatcher either runs a submitted unit job inline (multiprocessing
//! disabled) or queues it for a rayon fan-out at drain time. Jobs take their
//! unit by move: a worker physically cannot reach another unit's state, which
//! is the partitioned-storage guarantee the shared snapshot relies on. After
//! `drain()` joins all work, the registered final callback fires exactly
//! once, which is the aggregation trigger for callers.
//!
//! A [`Monitor`] thread provides the advisory liveness check: it polls the
//! shared [`TaskBoard`] at a fixed interval, reports queue counters, and
//! fires an on-idle hook once when the remaining count reaches zero.

use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Shared task-status counters, readable from the monitor thread.
///
/// Inline submission runs each job to completion before the next unit is
/// registered, so the raw counters transiently agree mid-campaign. The
/// sealed flag is what distinguishes that gap from a drained queue: it is
/// set once submission is closed, and observers must not treat
/// `done == total` as final before then.
#[derive(Debug, Clone, Default)]
pub struct TaskBoard {
    submitted: Arc<AtomicU64>,
    completed: Arc<AtomicU64>,
    sealed: Arc<AtomicBool>,
}

impl TaskBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self) {
        self.submitted.fetch_add(1, Ordering::SeqCst);
    }

    pub fn complete(&self) {
        self.completed.fetch_add(1, Ordering::SeqCst);
    }

    /// Closes submission. Called by the dispatcher when draining begins.
    pub fn seal(&self) {
        self.sealed.store(true, Ordering::SeqCst);
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::SeqCst)
    }

    /// (completed, submitted)
    pub fn snapshot(&self) -> (u64, u64) {
        (
            self.completed.load(Ordering::SeqCst),
            self.submitted.load(Ordering::SeqCst),
        )
    }

    pub fn remaining(&self) -> u64 {
        let (done, total) = self.snapshot();
        total.saturating_sub(done)
    }
}

type UnitJob<U> = Box<dyn FnOnce(&mut U) -> Result<(), EngineError> + Send>;

struct Pending<U> {
    id: String,
    unit: U,
    job: UnitJob<U>,
}

/// Result of one unit's processing pass; the unit itself moves back out so
/// the owner can reinstall it into its snapshot partition.
pub struct UnitOutcome<U> {
    pub id: String,
    pub unit: U,
    pub result: Result<(), EngineError>,
}

pub struct TaskDispatcher<U: Send> {
    parallel: bool,
    board: TaskBoard,
    pending: Vec<Pending<U>>,
    finished: Vec<UnitOutcome<U>>,
    final_callback: Option<Box<dyn FnOnce() + Send>>,
}

impl<U: Send> TaskDispatcher<U> {
    pub fn new(parallel: bool, board: TaskBoard) -> Self {
        Self {
            parallel,
            board,
            pending: Vec::new(),
            finished: Vec::new(),
            final_callback: None,
        }
    }

    /// Registers the callable invoked exactly once after `drain()`.
    pub fn set_final_callback(&mut self, callback: impl FnOnce() + Send + 'static) {
        self.final_callback = Some(Box::new(callback));
    }

    /// Submits a unit and its processing job.
    ///
    /// With multiprocessing disabled the job runs synchronously here; with it
    /// enabled the job is queued for the worker pool at drain time. Units are
    /// independent, so submission order affects only log and report order.
    pub fn submit(
        &mut self,
        id: impl Into<String>,
        mut unit: U,
        job: impl FnOnce(&mut U) -> Result<(), EngineError> + Send + 'static,
    ) {
        let id = id.into();
        self.board.register();

        if self.parallel {
            self.pending.push(Pending {
                id,
                unit,
                job: Box::new(job),
            });
        } else {
            debug!(unit = %id, "Processing unit inline.");
            let result = job(&mut unit);
            self.board.complete();
            self.finished.push(UnitOutcome { id, unit, result });
        }
    }

    /// Blocks until every submitted job has completed, then fires the final
    /// callback (if registered) exactly once.
    pub fn drain(&mut self) -> Vec<UnitOutcome<U>> {
        self.board.seal();
        let queued = std::mem::take(&mut self.pending);
        let mut outcomes = std::mem::take(&mut self.finished);

        if !queued.is_empty() {
            info!(units = queued.len(), "Fanning out queued units to the worker pool.");
            let board = self.board.clone();
            let pooled: Vec<UnitOutcome<U>> = queued
                .into_par_iter()
                .map(|mut pending| {
                    let result = (pending.job)(&mut pending.unit);
                    board.complete();
                    UnitOutcome {
                        id: pending.id,
                        unit: pending.unit,
                        result,
                    }
                })
                .collect();
            outcomes.extend(pooled);
        }

        for outcome in &outcomes {
            if let Err(e) = &outcome.result {
                warn!(unit = %outcome.id, error = %e, "Unit left resumable after failed pass.");
            }
        }

        if let Some(callback) = self.final_callback.take() {
            callback();
        }
        outcomes
    }
}

/// Advisory liveness monitor.
///
/// Runs on a lightweight timer thread outside the main work path and only
/// reads shared counters. Not a deadline or timeout mechanism.
pub struct Monitor {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

const POLL_SLICE_MS: u64 = 50;

impl Monitor {
    pub fn start(
        board: TaskBoard,
        interval: Duration,
        reporter: Arc<ProgressReporter>,
        on_idle: impl FnOnce() + Send + 'static,
    ) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = stop.clone();

        let handle = std::thread::spawn(move || {
            let mut on_idle = Some(on_idle);
            let mut last_report = Instant::now();

            loop {
                if stop_flag.load(Ordering::SeqCst) {
                    break;
                }

                // The counters alone are not enough: inline submission lets
                // them agree between units, so idle requires a sealed board.
                let (done, total) = board.snapshot();
                if board.is_sealed() && done == total {
                    reporter.report(Progress::QueueUpdate {
                        completed: done,
                        total,
                    });
                    if let Some(hook) = on_idle.take() {
                        debug!("All tasks completed; running idle finalization.");
                        hook();
                    }
                    break;
                }

                if last_report.elapsed() >= interval {
                    reporter.report(Progress::QueueUpdate {
                        completed: done,
                        total,
                    });
                    last_report = Instant::now();
                }
                std::thread::sleep(Duration::from_millis(POLL_SLICE_MS));
            }
        });

        Self {
            stop,
            handle: Some(handle),
        }
    }

    /// Signals the thread and joins it.
    pub fn stop(mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[derive(Debug, PartialEq)]
    struct Unit {
        value: u32,
    }

    fn run_dispatch(parallel: bool) {
        let board = TaskBoard::new();
        let mut dispatcher: TaskDispatcher<Unit> = TaskDispatcher::new(parallel, board.clone());

        let handled = Arc::new(AtomicUsize::new(0));
        let callback_seen = Arc::new(AtomicUsize::new(0));
        let handled_at_callback = Arc::new(AtomicUsize::new(0));

        for i in 0..8u32 {
            let handled = handled.clone();
            dispatcher.submit(format!("unit-{i}"), Unit { value: i }, move |unit| {
                unit.value += 100;
                handled.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
        }

        {
            let handled = handled.clone();
            let callback_seen = callback_seen.clone();
            let handled_at_callback = handled_at_callback.clone();
            dispatcher.set_final_callback(move || {
                callback_seen.fetch_add(1, Ordering::SeqCst);
                handled_at_callback.store(handled.load(Ordering::SeqCst), Ordering::SeqCst);
            });
        }

        let outcomes = dispatcher.drain();

        assert_eq!(outcomes.len(), 8);
        assert!(outcomes.iter().all(|o| o.result.is_ok()));
        assert!(outcomes.iter().all(|o| o.unit.value >= 100));
        // The callback fired exactly once, and only after every handler ran.
        assert_eq!(callback_seen.load(Ordering::SeqCst), 1);
        assert_eq!(handled_at_callback.load(Ordering::SeqCst), 8);
        assert_eq!(board.remaining(), 0);
    }

    #[test]
    fn sequential_drain_fires_callback_once_after_all_units() {
        run_dispatch(false);
    }

    #[test]
    fn pooled_drain_fires_callback_once_after_all_units() {
        run_dispatch(true);
    }

    #[test]
    fn failed_unit_is_returned_with_its_error() {
        let mut dispatcher: TaskDispatcher<Unit> = TaskDispatcher::new(false, TaskBoard::new());
        dispatcher.submit("bad", Unit { value: 0 }, |_| {
            Err(EngineError::StepExecution {
                complex: "bad".to_string(),
                step: "dock".to_string(),
                message: "engine missing".to_string(),
            })
        });
        let outcomes = dispatcher.drain();
        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].result.is_err());
    }

    #[test]
    fn monitor_fires_idle_hook_when_work_completes() {
        let board = TaskBoard::new();
        let idle = Arc::new(AtomicUsize::new(0));
        let idle_clone = idle.clone();

        let monitor = Monitor::start(
            board.clone(),
            Duration::from_millis(10),
            Arc::new(ProgressReporter::new()),
            move || {
                idle_clone.fetch_add(1, Ordering::SeqCst);
            },
        );

        board.register();
        board.register();
        board.complete();
        board.complete();
        board.seal();

        // Give the poll loop time to observe completion.
        std::thread::sleep(Duration::from_millis(300));
        monitor.stop();
        assert_eq!(idle.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn idle_hook_waits_until_the_board_is_sealed() {
        let board = TaskBoard::new();
        let idle = Arc::new(AtomicUsize::new(0));
        let idle_clone = idle.clone();

        let monitor = Monitor::start(
            board.clone(),
            Duration::from_millis(10),
            Arc::new(ProgressReporter::new()),
            move || {
                idle_clone.fetch_add(1, Ordering::SeqCst);
            },
        );

        // Inline submission pattern: each unit completes before the next is
        // registered, so the counters agree in the gap between units.
        board.register();
        board.complete();
        std::thread::sleep(Duration::from_millis(200));
        assert_eq!(
            idle.load(Ordering::SeqCst),
            0,
            "idle hook must not fire while submission is still open"
        );

        board.register();
        board.complete();
        board.seal();
        std::thread::sleep(Duration::from_millis(300));
        monitor.stop();
        assert_eq!(idle.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn drain_seals_the_board() {
        let board = TaskBoard::new();
        let mut dispatcher: TaskDispatcher<Unit> = TaskDispatcher::new(false, board.clone());
        dispatcher.submit("one", Unit { value: 1 }, |_| Ok(()));
        assert!(!board.is_sealed());

        dispatcher.drain();
        assert!(board.is_sealed());
    }
}
