//! World clock. Shows time only; it never reports itself as running.

use chrono::{DateTime, FixedOffset, Local, TimeZone, Utc};
use timetools_core::{MountScope, Program, ProgramProps, View};

pub const WORLDCLOCK_ID: &str = "worldclock";
pub const REFRESH_MILLIS: u64 = 1_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ZoneOffset {
    Local,
    /// Standard offset from UTC in seconds. Daylight saving is not applied.
    Fixed(i32),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Zone {
    pub name: &'static str,
    pub label: &'static str,
    pub region: &'static str,
    pub offset: ZoneOffset,
}

const HOUR: i32 = 3_600;

pub const ZONES: [Zone; 6] = [
    Zone {
        name: "Lokale Zeit",
        label: "Ihre Zeitzone",
        region: "Lokal",
        offset: ZoneOffset::Local,
    },
    Zone {
        name: "New York",
        label: "EST",
        region: "Amerika",
        offset: ZoneOffset::Fixed(-5 * HOUR),
    },
    Zone {
        name: "London",
        label: "GMT",
        region: "Europa",
        offset: ZoneOffset::Fixed(0),
    },
    Zone {
        name: "Paris",
        label: "CET",
        region: "Europa",
        offset: ZoneOffset::Fixed(HOUR),
    },
    Zone {
        name: "Tokyo",
        label: "JST",
        region: "Asien",
        offset: ZoneOffset::Fixed(9 * HOUR),
    },
    Zone {
        name: "Sydney",
        label: "AEST",
        region: "Ozeanien",
        offset: ZoneOffset::Fixed(10 * HOUR),
    },
];

impl Zone {
    /// `HH:MM:SS` at `now_millis`, or `--:--:--` if the instant is out of range.
    pub fn time_at(&self, now_millis: u64) -> String {
        let Some(utc) = Utc.timestamp_millis_opt(now_millis as i64).single() else {
            return "--:--:--".to_string();
        };
        match self.offset {
            ZoneOffset::Local => format_time(utc.with_timezone(&Local)),
            ZoneOffset::Fixed(seconds) => match FixedOffset::east_opt(seconds) {
                Some(offset) => format_time(utc.with_timezone(&offset)),
                None => "--:--:--".to_string(),
            },
        }
    }
}

fn format_time<Tz: TimeZone>(time: DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    time.format("%H:%M:%S").to_string()
}

#[derive(Debug, Default)]
pub struct WorldClock;

impl WorldClock {
    pub fn new() -> Self {
        Self
    }
}

impl Program for WorldClock {
    type Data = ();
    const STATIC_NAME: Option<&'static str> = Some(WORLDCLOCK_ID);

    fn initial_data(&self) -> Self::Data {}

    fn on_mount(&mut self, scope: &mut MountScope<'_, ()>) {
        let invalidator = scope.invalidator();
        scope.every(REFRESH_MILLIS, move |_caps, _now| invalidator.invalidate());
    }

    fn render(&mut self, props: &ProgramProps<'_, ()>) -> View {
        let mut view = View::new("Weltzeituhr");
        for zone in &ZONES {
            view.push(format!(
                "{:<12} {:<9} {:<13} {}",
                zone.name,
                zone.region,
                zone.label,
                zone.time_at(props.now_millis)
            ));
        }
        view
    }
}

#[cfg(test)]
#[path = "tests/worldclock_tests.rs"]
mod tests;
