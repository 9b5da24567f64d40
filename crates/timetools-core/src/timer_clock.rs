use crate::runtime::RuntimeHandle;
use crate::TimerId;

#[derive(Clone)]
pub struct TimerClock {
    runtime: RuntimeHandle,
}

impl TimerClock {
    pub fn new(runtime: RuntimeHandle) -> Self {
        Self { runtime }
    }

    pub fn runtime_handle(&self) -> RuntimeHandle {
        self.runtime.clone()
    }

    pub fn now_millis(&self) -> u64 {
        self.runtime.now_millis()
    }

    /// Calls `callback` with the current time every `interval_millis` until
    /// the returned registration is cancelled or dropped.
    pub fn every(
        &self,
        interval_millis: u64,
        callback: impl FnMut(u64) + 'static,
    ) -> TimerRegistration {
        let runtime = self.runtime.clone();
        match runtime.register_timer(interval_millis, callback) {
            Some(id) => TimerRegistration::new(runtime, id),
            None => TimerRegistration::inactive(runtime),
        }
    }
}

pub struct TimerRegistration {
    runtime: RuntimeHandle,
    id: Option<TimerId>,
}

impl TimerRegistration {
    fn new(runtime: RuntimeHandle, id: TimerId) -> Self {
        Self {
            runtime,
            id: Some(id),
        }
    }

    fn inactive(runtime: RuntimeHandle) -> Self {
        Self { runtime, id: None }
    }

    pub fn is_active(&self) -> bool {
        self.id
            .map(|id| self.runtime.is_timer_registered(id))
            .unwrap_or(false)
    }

    pub fn cancel(mut self) {
        if let Some(id) = self.id.take() {
            self.runtime.cancel_timer(id);
        }
    }
}

impl Drop for TimerRegistration {
    fn drop(&mut self) {
        if let Some(id) = self.id.take() {
            self.runtime.cancel_timer(id);
        }
    }
}

#[cfg(test)]
#[path = "tests/timer_clock_tests.rs"]
mod tests;
