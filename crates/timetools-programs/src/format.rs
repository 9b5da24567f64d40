/// `mm:ss.cc` for an elapsed time in milliseconds. Minutes are not wrapped.
pub fn format_stopwatch(elapsed_millis: u64) -> String {
    let minutes = elapsed_millis / 60_000;
    let seconds = (elapsed_millis % 60_000) / 1_000;
    let hundredths = (elapsed_millis % 1_000) / 10;
    format!("{minutes:02}:{seconds:02}.{hundredths:02}")
}

/// `mm:ss` for a duration in whole seconds.
pub fn format_timer(total_seconds: u64) -> String {
    let minutes = total_seconds / 60;
    let seconds = total_seconds % 60;
    format!("{minutes:02}:{seconds:02}")
}

/// Whole seconds left, rounded up so a running countdown shows `00:00`
/// only once it has actually finished.
pub fn remaining_seconds(remaining_millis: u64) -> u64 {
    remaining_millis.div_ceil(1_000)
}
