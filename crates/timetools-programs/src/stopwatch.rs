//! Stopwatch with laps.
//!
//! Elapsed time is derived from the accumulated total plus the time since
//! the last start, so a remounted instance shows the right value even though
//! its tick timer did not run while it was unmounted.

use timetools_core::{Action, Capabilities, MountScope, Program, ProgramProps, ToolsError, View};

use crate::format::format_stopwatch;

pub const STOPWATCH_ID: &str = "stopwatch";
pub const TICK_MILLIS: u64 = 10;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Lap {
    pub number: usize,
    /// Total elapsed time when the lap was taken.
    pub time_millis: u64,
    /// Time since the previous lap.
    pub duration_millis: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StopwatchData {
    pub accumulated_millis: u64,
    pub started_at: Option<u64>,
    /// Newest first.
    pub laps: Vec<Lap>,
}

impl StopwatchData {
    pub fn elapsed_at(&self, now_millis: u64) -> u64 {
        let current = self
            .started_at
            .map(|started| now_millis.saturating_sub(started))
            .unwrap_or(0);
        self.accumulated_millis + current
    }

    fn start(&mut self, now_millis: u64) {
        if self.started_at.is_none() {
            self.started_at = Some(now_millis);
        }
    }

    fn pause(&mut self, now_millis: u64) {
        self.accumulated_millis = self.elapsed_at(now_millis);
        self.started_at = None;
    }

    fn record_lap(&mut self, now_millis: u64) -> &Lap {
        let time_millis = self.elapsed_at(now_millis);
        let previous = self.laps.first().map(|lap| lap.time_millis).unwrap_or(0);
        self.laps.insert(
            0,
            Lap {
                number: self.laps.len() + 1,
                time_millis,
                duration_millis: time_millis.saturating_sub(previous),
            },
        );
        &self.laps[0]
    }
}

/// Brings the clock in line with `running` when it was flipped through the
/// instance handle instead of an action.
fn follow_running(caps: &Capabilities<StopwatchData>, now_millis: u64) {
    let running = caps.running().get();
    let started = caps.data().get().started_at.is_some();
    if running && !started {
        caps.data().update(|data| data.start(now_millis));
    } else if !running && started {
        caps.data().update(|data| data.pause(now_millis));
    }
}

#[derive(Debug, Default)]
pub struct Stopwatch;

impl Stopwatch {
    pub fn new() -> Self {
        Self
    }

    fn start(props: &ProgramProps<'_, StopwatchData>) {
        let now = props.now_millis;
        props.capabilities.data().update(|data| data.start(now));
        props.set_running(true);
    }

    fn pause(props: &ProgramProps<'_, StopwatchData>) {
        let now = props.now_millis;
        props.capabilities.data().update(|data| data.pause(now));
        props.set_running(false);
    }
}

impl Program for Stopwatch {
    type Data = StopwatchData;
    const STATIC_NAME: Option<&'static str> = Some(STOPWATCH_ID);

    fn initial_data(&self) -> StopwatchData {
        StopwatchData::default()
    }

    fn on_mount(&mut self, scope: &mut MountScope<'_, StopwatchData>) {
        follow_running(scope.capabilities(), scope.now_millis());

        let invalidator = scope.invalidator();
        scope.every(TICK_MILLIS, move |caps, now| {
            follow_running(caps, now);
            if caps.running().get() {
                invalidator.invalidate();
            }
        });
    }

    fn render(&mut self, props: &ProgramProps<'_, StopwatchData>) -> View {
        let data = props.data();
        let mut view = View::new("Stoppuhr")
            .line(format_stopwatch(data.elapsed_at(props.now_millis)))
            .line(if props.running() { "running" } else { "paused" });
        for lap in &data.laps {
            view.push(format!(
                "Lap {:>2}  {}  {}",
                lap.number,
                format_stopwatch(lap.duration_millis),
                format_stopwatch(lap.time_millis)
            ));
        }
        view
    }

    fn on_action(
        &mut self,
        props: &ProgramProps<'_, StopwatchData>,
        action: &Action,
    ) -> Result<(), ToolsError> {
        match action.verb.as_str() {
            "start" => Self::start(props),
            "pause" | "stop" => Self::pause(props),
            "toggle" => {
                if props.running() {
                    Self::pause(props);
                } else {
                    Self::start(props);
                }
            }
            "reset" => {
                props.set_data(StopwatchData::default());
                props.set_running(false);
            }
            "lap" => {
                let now = props.now_millis;
                if !props.running() && props.data().elapsed_at(now) == 0 {
                    return Err(ToolsError::invalid_argument(
                        STOPWATCH_ID,
                        "lap",
                        "stopwatch has not been started",
                    ));
                }
                let lap = props
                    .capabilities
                    .data()
                    .update(|data| data.record_lap(now).clone());
                log::debug!("lap {} at {}", lap.number, format_stopwatch(lap.time_millis));
            }
            other => return Err(ToolsError::unsupported(STOPWATCH_ID, other)),
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/stopwatch_tests.rs"]
mod tests;
