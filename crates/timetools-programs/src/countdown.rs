//! Countdown timer.

use timetools_core::{Action, Capabilities, MountScope, Program, ProgramProps, ToolsError, View};

use crate::format::{format_timer, remaining_seconds};

pub const TIMER_ID: &str = "timer";
pub const TICK_MILLIS: u64 = 100;
pub const PRESET_MINUTES: [u64; 4] = [5, 10, 15, 25];
pub const QUICK_ADJUST_SECONDS: [i64; 2] = [60, 30];

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CountdownData {
    /// Time left while paused. Ignored while a deadline is set.
    pub remaining_millis: u64,
    pub deadline: Option<u64>,
    pub finished: bool,
}

impl CountdownData {
    pub fn remaining_at(&self, now_millis: u64) -> u64 {
        match self.deadline {
            Some(deadline) => deadline.saturating_sub(now_millis),
            None => self.remaining_millis,
        }
    }

    fn expired_at(&self, now_millis: u64) -> bool {
        matches!(self.deadline, Some(deadline) if deadline <= now_millis)
    }

    fn paused(remaining_millis: u64) -> Self {
        Self {
            remaining_millis,
            deadline: None,
            finished: false,
        }
    }
}

#[derive(Debug, Default)]
pub struct CountdownTimer;

impl CountdownTimer {
    pub fn new() -> Self {
        Self
    }
}

/// Settles an expired deadline. Returns true when the countdown finished.
fn finish_if_expired(caps: &Capabilities<CountdownData>, now_millis: u64) -> bool {
    let data = caps.data().get();
    if !data.expired_at(now_millis) {
        return false;
    }
    caps.data().set(CountdownData {
        remaining_millis: 0,
        deadline: None,
        finished: true,
    });
    caps.running().set(false);
    log::info!("countdown finished");
    true
}

/// Sets or drops the deadline when `running` was flipped through the
/// instance handle instead of an action. Nothing to count down means not
/// running.
fn follow_running(caps: &Capabilities<CountdownData>, now_millis: u64) {
    let running = caps.running().get();
    let data = caps.data().get();
    match (running, data.deadline) {
        (true, None) if data.remaining_millis == 0 => caps.running().set(false),
        (true, None) => caps.data().set(CountdownData {
            remaining_millis: data.remaining_millis,
            deadline: Some(now_millis.saturating_add(data.remaining_millis)),
            finished: false,
        }),
        (false, Some(_)) => caps
            .data()
            .set(CountdownData::paused(data.remaining_at(now_millis))),
        _ => {}
    }
}

fn parse_seconds(verb: &str, arg: Option<&str>) -> Result<i64, ToolsError> {
    let arg = arg.ok_or_else(|| ToolsError::invalid_argument(TIMER_ID, verb, "missing seconds"))?;
    arg.parse::<i64>()
        .map_err(|_| ToolsError::invalid_argument(TIMER_ID, verb, format!("'{arg}' is not a number")))
}

impl Program for CountdownTimer {
    type Data = CountdownData;
    const STATIC_NAME: Option<&'static str> = Some(TIMER_ID);

    fn initial_data(&self) -> CountdownData {
        CountdownData::default()
    }

    fn on_mount(&mut self, scope: &mut MountScope<'_, CountdownData>) {
        // The deadline may have passed while the timer was not mounted.
        finish_if_expired(scope.capabilities(), scope.now_millis());
        follow_running(scope.capabilities(), scope.now_millis());

        let invalidator = scope.invalidator();
        scope.every(TICK_MILLIS, move |caps, now| {
            follow_running(caps, now);
            if !caps.running().get() {
                return;
            }
            if !finish_if_expired(caps, now) {
                invalidator.invalidate();
            }
        });
    }

    fn render(&mut self, props: &ProgramProps<'_, CountdownData>) -> View {
        let data = props.data();
        let remaining = remaining_seconds(data.remaining_at(props.now_millis));
        let status = if props.running() {
            "running"
        } else if data.finished {
            "finished"
        } else {
            "paused"
        };
        let presets: Vec<String> = PRESET_MINUTES
            .iter()
            .map(|minutes| format!("{minutes}:00"))
            .collect();
        let quick: Vec<String> = QUICK_ADJUST_SECONDS
            .iter()
            .map(|seconds| format!("+{}:{:02}", seconds / 60, seconds % 60))
            .collect();
        View::new("Timer")
            .line(format_timer(remaining))
            .line(status)
            .line(format!("presets {}  quick {}", presets.join(" "), quick.join(" ")))
    }

    fn on_action(
        &mut self,
        props: &ProgramProps<'_, CountdownData>,
        action: &Action,
    ) -> Result<(), ToolsError> {
        let now = props.now_millis;
        let verb = action.verb.as_str();
        match verb {
            "set" => {
                let seconds = parse_seconds(verb, action.first_arg())?;
                if seconds < 0 {
                    return Err(ToolsError::invalid_argument(TIMER_ID, verb, "seconds must not be negative"));
                }
                let millis = (seconds as u64).checked_mul(1_000).ok_or_else(|| {
                    ToolsError::invalid_argument(TIMER_ID, verb, "duration too large")
                })?;
                props.set_data(CountdownData::paused(millis));
                props.set_running(false);
            }
            "preset" => {
                let minutes = action
                    .first_arg()
                    .and_then(|arg| arg.parse::<u64>().ok())
                    .filter(|minutes| PRESET_MINUTES.contains(minutes))
                    .ok_or_else(|| {
                        ToolsError::invalid_argument(TIMER_ID, verb, "expected one of 5, 10, 15, 25")
                    })?;
                props.set_data(CountdownData::paused(minutes * 60_000));
                props.set_running(false);
            }
            "add" => {
                let delta_millis = parse_seconds(verb, action.first_arg())?.saturating_mul(1_000);
                props.capabilities.data().update(|data| {
                    let current = i64::try_from(data.remaining_at(now)).unwrap_or(i64::MAX);
                    let next = current.saturating_add(delta_millis).max(0) as u64;
                    match data.deadline {
                        Some(_) => data.deadline = Some(now.saturating_add(next)),
                        None => data.remaining_millis = next,
                    }
                    if next > 0 {
                        data.finished = false;
                    }
                });
            }
            "start" => {
                if props.running() {
                    return Ok(());
                }
                let data = props.data();
                if data.remaining_millis == 0 {
                    return Err(ToolsError::invalid_argument(TIMER_ID, verb, "no time set"));
                }
                props.set_data(CountdownData {
                    remaining_millis: data.remaining_millis,
                    deadline: Some(now.saturating_add(data.remaining_millis)),
                    finished: false,
                });
                props.set_running(true);
            }
            "pause" | "stop" => {
                let data = props.data();
                props.set_data(CountdownData::paused(data.remaining_at(now)));
                props.set_running(false);
            }
            "reset" => {
                props.set_data(CountdownData::default());
                props.set_running(false);
            }
            other => return Err(ToolsError::unsupported(TIMER_ID, other)),
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/countdown_tests.rs"]
mod tests;
