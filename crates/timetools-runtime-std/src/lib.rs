//! Standard runtime services backed by Rust's `std` library.
//!
//! This crate provides concrete implementations of the platform
//! abstraction traits defined in `timetools-core`. Hosts construct a
//! [`StdRuntime`] and hand its [`Runtime`] to the shell so timers run
//! against the system clock.

use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use timetools_core::{Clock, Runtime, RuntimeHandle, RuntimeScheduler, TimerClock};

type Waker = Arc<dyn Fn() + Send + Sync + 'static>;

/// Scheduler that records tick requests and optionally wakes the host loop.
pub struct StdScheduler {
    tick_requested: AtomicBool,
    tick_waker: RwLock<Option<Waker>>,
}

impl StdScheduler {
    pub fn new() -> Self {
        Self {
            tick_requested: AtomicBool::new(false),
            tick_waker: RwLock::new(None),
        }
    }

    /// Returns whether a tick has been requested since the last call.
    pub fn take_tick_request(&self) -> bool {
        self.tick_requested.swap(false, Ordering::SeqCst)
    }

    /// Registers a waker that will be invoked whenever a tick is scheduled.
    pub fn set_tick_waker(&self, waker: impl Fn() + Send + Sync + 'static) {
        *self
            .tick_waker
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(waker));
    }

    pub fn clear_tick_waker(&self) {
        *self
            .tick_waker
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn wake(&self) {
        let waker = self
            .tick_waker
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(waker) = waker {
            waker();
        }
    }
}

impl Default for StdScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StdScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdScheduler")
            .field("tick_requested", &self.tick_requested.load(Ordering::SeqCst))
            .finish()
    }
}

impl RuntimeScheduler for StdScheduler {
    fn schedule_tick(&self) {
        self.tick_requested.store(true, Ordering::SeqCst);
        self.wake();
    }
}

/// Wall clock backed by [`SystemTime`].
#[derive(Debug, Default, Clone)]
pub struct StdClock;

impl StdClock {
    pub fn since_epoch(&self) -> Duration {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
    }
}

impl Clock for StdClock {
    fn now_millis(&self) -> u64 {
        self.since_epoch().as_millis() as u64
    }
}

/// Convenience container bundling the standard scheduler and clock.
#[derive(Clone)]
pub struct StdRuntime {
    scheduler: Arc<StdScheduler>,
    clock: Rc<StdClock>,
    runtime: Runtime,
}

impl StdRuntime {
    pub fn new() -> Self {
        let scheduler = Arc::new(StdScheduler::default());
        let clock = Rc::new(StdClock);
        let runtime = Runtime::new(scheduler.clone(), clock.clone());
        Self {
            scheduler,
            clock,
            runtime,
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

    pub fn scheduler(&self) -> Arc<StdScheduler> {
        Arc::clone(&self.scheduler)
    }

    pub fn clock(&self) -> Rc<StdClock> {
        Rc::clone(&self.clock)
    }

    pub fn take_tick_request(&self) -> bool {
        self.scheduler.take_tick_request()
    }

    pub fn set_tick_waker(&self, waker: impl Fn() + Send + Sync + 'static) {
        self.scheduler.set_tick_waker(waker);
    }

    pub fn clear_tick_waker(&self) {
        self.scheduler.clear_tick_waker();
    }

    /// Fires every timer due at the current wall-clock time.
    pub fn drain_due_timers(&self) -> usize {
        self.runtime.drain_due_timers()
    }

    /// How long the host may sleep before the next timer is due.
    pub fn time_until_next_timer(&self) -> Option<Duration> {
        let due = self.runtime.next_due_millis()?;
        let now = self.runtime.now_millis();
        Some(Duration::from_millis(due.saturating_sub(now)))
    }
}

impl fmt::Debug for StdRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdRuntime")
            .field("scheduler", &self.scheduler)
            .field("clock", &self.clock)
            .finish()
    }
}

impl Default for StdRuntime {
    fn default() -> Self {
        Self::new()
    }
}
