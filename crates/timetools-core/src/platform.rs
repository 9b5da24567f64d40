//! Platform abstraction traits for the Time Tools runtime.
//!
//! The runtime never reads the system clock or wakes the host directly. It
//! delegates both to these traits so the same lifecycle core can be driven
//! by a real event loop or by a test harness with a hand-cranked clock.

/// Schedules work for the runtime.
///
/// Implementations are told whenever timer work has been registered so the
/// host can make sure its loop keeps ticking. They must be safe to share
/// across threads even though the runtime itself is single-threaded.
pub trait RuntimeScheduler: Send + Sync {
    /// Request that the host run another update pass.
    fn schedule_tick(&self);
}

/// Provides wall-clock time to the runtime.
pub trait Clock {
    /// Milliseconds since the Unix epoch.
    fn now_millis(&self) -> u64;
}
