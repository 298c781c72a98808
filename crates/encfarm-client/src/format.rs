//! Human-readable formatting for durations, sizes, bitrates and progress.
//!
//! Every function here is total: missing or degenerate input renders as
//! [`NOT_AVAILABLE`] instead of failing.

use std::time::Duration;

/// Placeholder for values that are missing or meaningless.
pub const NOT_AVAILABLE: &str = "N/A";

/// Number of cells in the progress bar.
pub const BAR_CELLS: usize = 20;

/// Percentage covered by one bar cell.
const PERCENT_PER_CELL: u32 = 100 / BAR_CELLS as u32;

const FILLED_CELL: char = '█';
const EMPTY_CELL: char = '░';

const SIZE_UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

/// Format a duration in seconds as `"1h 1m 1s"`, dropping leading zero units.
///
/// Anything below one second (or absent) is `"N/A"`.
pub fn format_duration(seconds: Option<f64>) -> String {
    let Some(seconds) = seconds.filter(|s| s.is_finite() && *s >= 1.0) else {
        return NOT_AVAILABLE.to_string();
    };

    let total = seconds.floor() as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;

    if hours > 0 {
        format!("{hours}h {minutes}m {secs}s")
    } else if minutes > 0 {
        format!("{minutes}m {secs}s")
    } else {
        format!("{secs}s")
    }
}

/// Format a byte count using the largest unit that keeps the value below 1024.
pub fn format_size(bytes: Option<u64>) -> String {
    let Some(bytes) = bytes.filter(|b| *b > 0) else {
        return NOT_AVAILABLE.to_string();
    };

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.2} {}", SIZE_UNITS[unit])
}

/// Format bits per second as megabits per second.
pub fn format_bitrate(bits_per_second: Option<f64>) -> String {
    match bits_per_second.filter(|b| b.is_finite() && *b > 0.0) {
        Some(bps) => format!("{:.2} Mbps", bps / 1_000_000.0),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// Number of filled bar cells for a percentage.
pub fn filled_cells(progress: u8) -> usize {
    (u32::from(progress) / PERCENT_PER_CELL).min(BAR_CELLS as u32) as usize
}

/// Render the 20-cell progress bar.
pub fn progress_bar(progress: u8) -> String {
    let filled = filled_cells(progress);
    let mut bar = String::with_capacity(BAR_CELLS * FILLED_CELL.len_utf8());
    bar.extend(std::iter::repeat_n(FILLED_CELL, filled));
    bar.extend(std::iter::repeat_n(EMPTY_CELL, BAR_CELLS - filled));
    bar
}

/// Elapsed wall-clock time with one decimal, e.g. `"12.3s"`.
pub fn format_elapsed(elapsed: Duration) -> String {
    format!("{:.1}s", elapsed.as_secs_f64())
}

/// Optional score with two decimals.
pub fn format_score(score: Option<f64>) -> String {
    match score.filter(|s| s.is_finite()) {
        Some(s) => format!("{s:.2}"),
        None => NOT_AVAILABLE.to_string(),
    }
}
