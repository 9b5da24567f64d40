use std::cell::Cell;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use timetools_core::{Clock, Runtime, RuntimeHandle, RuntimeScheduler, TimerClock};

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<u64>,
}

impl ManualClock {
    pub fn starting_at(now_millis: u64) -> Self {
        Self {
            now: Cell::new(now_millis),
        }
    }

    pub fn set(&self, now_millis: u64) {
        self.now.set(now_millis);
    }

    pub fn advance(&self, millis: u64) {
        self.now.set(self.now.get() + millis);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> u64 {
        self.now.get()
    }
}

/// Scheduler that counts tick requests.
#[derive(Debug, Default)]
pub struct RecordingScheduler {
    requests: AtomicUsize,
}

impl RecordingScheduler {
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// Returns the number of requests since the last call and resets it.
    pub fn take_requests(&self) -> usize {
        self.requests.swap(0, Ordering::SeqCst)
    }
}

impl RuntimeScheduler for RecordingScheduler {
    fn schedule_tick(&self) {
        self.requests.fetch_add(1, Ordering::SeqCst);
    }
}

/// Headless harness for driving timers with a manual clock.
///
/// `TimeHarness` owns a [`Runtime`] wired to a [`ManualClock`] and a
/// [`RecordingScheduler`]. Tests move time with [`TimeHarness::advance`],
/// which steps through every intermediate timer deadline so periodic
/// callbacks observe the same cadence they would under a real loop.
pub struct TimeHarness {
    runtime: Runtime,
    clock: Rc<ManualClock>,
    scheduler: Arc<RecordingScheduler>,
}

impl TimeHarness {
    /// Starts at a fixed, non-zero epoch so timestamp arithmetic never
    /// has to special-case zero.
    pub const DEFAULT_EPOCH_MILLIS: u64 = 1_700_000_000_000;

    pub fn new() -> Self {
        Self::starting_at(Self::DEFAULT_EPOCH_MILLIS)
    }

    pub fn starting_at(now_millis: u64) -> Self {
        let clock = Rc::new(ManualClock::starting_at(now_millis));
        let scheduler = Arc::new(RecordingScheduler::default());
        let runtime = Runtime::new(scheduler.clone(), clock.clone());
        Self {
            runtime,
            clock,
            scheduler,
        }
    }

    pub fn runtime(&self) -> Runtime {
        self.runtime.clone()
    }

    pub fn runtime_handle(&self) -> RuntimeHandle {
        self.runtime.handle()
    }

    pub fn timer_clock(&self) -> TimerClock {
        self.runtime.timer_clock()
    }

    pub fn clock(&self) -> Rc<ManualClock> {
        Rc::clone(&self.clock)
    }

    pub fn scheduler(&self) -> Arc<RecordingScheduler> {
        Arc::clone(&self.scheduler)
    }

    pub fn now_millis(&self) -> u64 {
        self.clock.now_millis()
    }

    /// Moves time forward by `millis`, firing timers at each deadline on the
    /// way. Returns the total number of timer callbacks fired.
    pub fn advance(&self, millis: u64) -> usize {
        let target = self.clock.now_millis() + millis;
        let mut fired = 0;
        while let Some(due) = self.runtime.next_due_millis() {
            if due > target {
                break;
            }
            self.clock.set(due.max(self.clock.now_millis()));
            fired += self.runtime.drain_due_timers();
        }
        self.clock.set(target);
        fired + self.runtime.drain_due_timers()
    }

    /// Jumps straight to `now + millis` and drains once, the way a host that
    /// was suspended would observe time.
    pub fn jump(&self, millis: u64) -> usize {
        self.clock.advance(millis);
        self.runtime.drain_due_timers()
    }
}

impl Default for TimeHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience helper for tests that only need temporary access to a
/// `TimeHarness`.
pub fn run_with_harness<R>(f: impl FnOnce(&TimeHarness) -> R) -> R {
    let harness = TimeHarness::new();
    f(&harness)
}
