use chrono::{DateTime, NaiveDate, Utc};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

// ========================================================================= //

/// Converts a `SystemTime` to a Windows `FILETIME`.
pub fn filetime_from_system_time(timestamp: SystemTime) -> u64 {
    match timestamp.duration_since(filetime_epoch()) {
        Ok(delta) => {
            delta.as_secs() * 10_000_000 + (delta.subsec_nanos() / 100) as u64
        }
        Err(_) => 0,
    }
}

/// Converts a Windows `FILETIME` to a `SystemTime`.
pub fn system_time_from_filetime(timestamp: u64) -> SystemTime {
    let delta = Duration::new(
        timestamp / 10_000_000,
        (timestamp % 10_000_000) as u32 * 100,
    );
    filetime_epoch() + delta
}

/// Returns the epoch used for Windows `FILETIME` values.
fn filetime_epoch() -> SystemTime {
    // The epoch used by CFB files is Jan 1, 1601 UTC, which we can calculate
    // from the Unix epoch constant, which is Jan 1, 1970 UTC.
    UNIX_EPOCH - Duration::from_secs(11644473600)
}

// ========================================================================= //

const TEXT_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// Parses a timestamp written as `YYYY/MM/DD hh:mm:ss` (UTC), the format
/// used for summary information in import files.  Leading blanks before the
/// date and the time are allowed, and fields need not be zero-padded.
pub fn parse_text(text: &str) -> Option<SystemTime> {
    let text = text.trim_start_matches([' ', '\t']);
    let (date, time) = text.split_once(' ')?;
    let time = time.trim_start_matches([' ', '\t']).trim_end();
    let date: Vec<&str> = date.split('/').collect();
    let time: Vec<&str> = time.split(':').collect();
    if date.len() != 3 || time.len() != 3 {
        return None;
    }
    let year: i32 = date[0].parse().ok()?;
    if !(1601..=30827).contains(&year) {
        return None;
    }
    let month: u32 = date[1].parse().ok()?;
    let day: u32 = date[2].parse().ok()?;
    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    let datetime = date.and_hms_opt(time[0].parse().ok()?,
                                    time[1].parse().ok()?,
                                    time[2].parse().ok()?)?;
    Some(SystemTime::from(datetime.and_utc()))
}

/// Formats a timestamp as `YYYY/MM/DD hh:mm:ss` (UTC).
pub fn format_text(timestamp: SystemTime) -> String {
    DateTime::<Utc>::from(timestamp).format(TEXT_FORMAT).to_string()
}

// ========================================================================= //


// ========================================================================= //
