//! Manual clock and time harness for driving programs in tests.

pub mod testing;

pub use testing::{run_with_harness, ManualClock, RecordingScheduler, TimeHarness};
