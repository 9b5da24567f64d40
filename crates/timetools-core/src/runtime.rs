use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::sync::Arc;

use crate::platform::{Clock, RuntimeScheduler};
use crate::timer_clock::TimerClock;
use crate::TimerId;

type TimerCallback = Rc<RefCell<Box<dyn FnMut(u64) + 'static>>>;

struct TimerEntry {
    id: TimerId,
    interval_millis: u64,
    next_due_millis: u64,
    callback: TimerCallback,
}

struct RuntimeInner {
    scheduler: Arc<dyn RuntimeScheduler>,
    clock: Rc<dyn Clock>,
    needs_tick: Cell<bool>,
    timers: RefCell<Vec<TimerEntry>>,
    next_timer_id: Cell<u64>,
}

impl RuntimeInner {
    fn new(scheduler: Arc<dyn RuntimeScheduler>, clock: Rc<dyn Clock>) -> Self {
        Self {
            scheduler,
            clock,
            needs_tick: Cell::new(false),
            timers: RefCell::new(Vec::new()),
            next_timer_id: Cell::new(1),
        }
    }

    fn schedule(&self) {
        self.needs_tick.set(true);
        self.scheduler.schedule_tick();
    }

    fn now_millis(&self) -> u64 {
        self.clock.now_millis()
    }

    fn register_timer(
        &self,
        interval_millis: u64,
        callback: Box<dyn FnMut(u64) + 'static>,
    ) -> TimerId {
        let id = self.next_timer_id.get();
        self.next_timer_id.set(id + 1);
        let interval_millis = interval_millis.max(1);
        self.timers.borrow_mut().push(TimerEntry {
            id,
            interval_millis,
            next_due_millis: self.now_millis().saturating_add(interval_millis),
            callback: Rc::new(RefCell::new(callback)),
        });
        log::debug!("registered timer {id} every {interval_millis}ms");
        self.schedule();
        id
    }

    fn cancel_timer(&self, id: TimerId) {
        let mut timers = self.timers.borrow_mut();
        if let Some(index) = timers.iter().position(|entry| entry.id == id) {
            timers.remove(index);
            log::debug!("cancelled timer {id}");
        }
        if timers.is_empty() {
            self.needs_tick.set(false);
        }
    }

    fn is_registered(&self, id: TimerId) -> bool {
        self.timers.borrow().iter().any(|entry| entry.id == id)
    }

    fn has_timers(&self) -> bool {
        !self.timers.borrow().is_empty()
    }

    fn next_due_millis(&self) -> Option<u64> {
        self.timers
            .borrow()
            .iter()
            .map(|entry| entry.next_due_millis)
            .min()
    }

    fn drain_timers(&self, now_millis: u64) -> usize {
        let due: Vec<(TimerId, TimerCallback)> = {
            let mut timers = self.timers.borrow_mut();
            timers
                .iter_mut()
                .filter(|entry| entry.next_due_millis <= now_millis)
                .map(|entry| {
                    // Missed periods collapse into a single firing.
                    while entry.next_due_millis <= now_millis {
                        entry.next_due_millis += entry.interval_millis;
                    }
                    (entry.id, Rc::clone(&entry.callback))
                })
                .collect()
        };
        let mut fired = 0;
        for (id, callback) in due {
            // An earlier callback in this pass may have torn down the owner.
            if !self.is_registered(id) {
                continue;
            }
            let mut guard = callback.borrow_mut();
            let tick: &mut dyn FnMut(u64) = &mut **guard;
            tick(now_millis);
            fired += 1;
        }
        self.needs_tick.set(self.has_timers());
        fired
    }
}

#[derive(Clone)]
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

impl Runtime {
    pub fn new(scheduler: Arc<dyn RuntimeScheduler>, clock: Rc<dyn Clock>) -> Self {
        Self {
            inner: Rc::new(RuntimeInner::new(scheduler, clock)),
        }
    }

    pub fn handle(&self) -> RuntimeHandle {
        RuntimeHandle(Rc::downgrade(&self.inner))
    }

    pub fn now_millis(&self) -> u64 {
        self.inner.now_millis()
    }

    pub fn needs_tick(&self) -> bool {
        self.inner.needs_tick.get()
    }

    pub fn has_timers(&self) -> bool {
        self.inner.has_timers()
    }

    pub fn next_due_millis(&self) -> Option<u64> {
        self.inner.next_due_millis()
    }

    /// Fires every timer that is due at the clock's current time.
    pub fn drain_due_timers(&self) -> usize {
        let now = self.inner.now_millis();
        self.inner.drain_timers(now)
    }

    pub fn drain_timers(&self, now_millis: u64) -> usize {
        self.inner.drain_timers(now_millis)
    }

    pub fn timer_clock(&self) -> TimerClock {
        TimerClock::new(self.handle())
    }
}

/// Scheduler for hosts that poll instead of waiting for tick requests.
#[derive(Default)]
pub struct DefaultScheduler;

impl RuntimeScheduler for DefaultScheduler {
    fn schedule_tick(&self) {}
}

#[cfg(test)]
#[derive(Default)]
pub struct TestClock {
    now: Cell<u64>,
}

#[cfg(test)]
impl TestClock {
    pub fn advance(&self, millis: u64) {
        self.now.set(self.now.get() + millis);
    }
}

#[cfg(test)]
impl Clock for TestClock {
    fn now_millis(&self) -> u64 {
        self.now.get()
    }
}

#[cfg(test)]
pub struct TestRuntime {
    runtime: Runtime,
    clock: Rc<TestClock>,
}

#[cfg(test)]
impl TestRuntime {
    pub fn new() -> Self {
        let clock = Rc::new(TestClock::default());
        Self {
            runtime: Runtime::new(Arc::new(DefaultScheduler), clock.clone()),
            clock,
        }
    }

    pub fn runtime(&self) -> Runtime {
        self.runtime.clone()
    }

    pub fn handle(&self) -> RuntimeHandle {
        self.runtime.handle()
    }

    /// Moves the clock forward one millisecond at a time, draining timers
    /// after each step so periodic callbacks fire at their real cadence.
    pub fn advance(&self, millis: u64) {
        for _ in 0..millis {
            self.clock.advance(1);
            self.runtime.drain_due_timers();
        }
    }
}

#[derive(Clone)]
pub struct RuntimeHandle(pub(crate) Weak<RuntimeInner>);

impl RuntimeHandle {
    pub fn schedule(&self) {
        if let Some(inner) = self.0.upgrade() {
            inner.schedule();
        }
    }

    /// Returns 0 once the runtime has been dropped.
    pub fn now_millis(&self) -> u64 {
        self.0
            .upgrade()
            .map(|inner| inner.now_millis())
            .unwrap_or(0)
    }

    pub fn register_timer(
        &self,
        interval_millis: u64,
        callback: impl FnMut(u64) + 'static,
    ) -> Option<TimerId> {
        self.0
            .upgrade()
            .map(|inner| inner.register_timer(interval_millis, Box::new(callback)))
    }

    pub fn cancel_timer(&self, id: TimerId) {
        if let Some(inner) = self.0.upgrade() {
            inner.cancel_timer(id);
        }
    }

    pub fn is_timer_registered(&self, id: TimerId) -> bool {
        self.0
            .upgrade()
            .map(|inner| inner.is_registered(id))
            .unwrap_or(false)
    }

    pub fn has_timers(&self) -> bool {
        self.0
            .upgrade()
            .map(|inner| inner.has_timers())
            .unwrap_or(false)
    }

    pub fn timer_clock(&self) -> TimerClock {
        TimerClock::new(self.clone())
    }
}
