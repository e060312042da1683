use chrono::{Duration, NaiveDate};

/// Formats a number of seconds as `HH:MM:SS`. Hours are not wrapped at 24.
pub fn format_hms(seconds: u32) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let seconds = seconds % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

/// Returns `count` consecutive dates ending with `last` (inclusive), oldest first.
pub fn trailing_days(last: NaiveDate, count: u32) -> Vec<NaiveDate> {
    (0..count)
        .rev()
        .map(|back| last - Duration::days(back.into()))
        .collect()
}
