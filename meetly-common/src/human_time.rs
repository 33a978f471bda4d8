//! Human-readable duration formatting
//!
//! Two display styles are used across Meetly:
//! - Clock style (`MM:SS` / `HH:MM:SS`) for the running in-meeting timer
//! - Unit style (`Xm Ys` / `Xh Ym Zs`) for attendance reports

const SECS_PER_HOUR: u64 = 3600;
const SECS_PER_MINUTE: u64 = 60;

fn split_hms(seconds: u64) -> (u64, u64, u64) {
    let hours = seconds / SECS_PER_HOUR;
    let minutes = (seconds % SECS_PER_HOUR) / SECS_PER_MINUTE;
    let secs = seconds % SECS_PER_MINUTE;
    (hours, minutes, secs)
}

/// Format an elapsed meeting time as a clock.
///
/// Hours are only shown once the meeting has run for an hour.
///
/// # Examples
///
/// ```
/// use meetly_common::human_time::format_elapsed;
///
/// assert_eq!(format_elapsed(0), "00:00");
/// assert_eq!(format_elapsed(75), "01:15");
/// assert_eq!(format_elapsed(3661), "01:01:01");
/// ```
pub fn format_elapsed(seconds: u64) -> String {
    let (hours, minutes, secs) = split_hms(seconds);
    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}

/// Format an attended duration with units, as shown in attendance reports.
///
/// # Examples
///
/// ```
/// use meetly_common::human_time::format_duration;
///
/// assert_eq!(format_duration(0), "0m 0s");
/// assert_eq!(format_duration(125), "2m 5s");
/// assert_eq!(format_duration(3725), "1h 2m 5s");
/// ```
pub fn format_duration(seconds: u64) -> String {
    let (hours, minutes, secs) = split_hms(seconds);
    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, secs)
    } else {
        format!("{}m {}s", minutes, secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elapsed_under_an_hour() {
        assert_eq!(format_elapsed(0), "00:00");
        assert_eq!(format_elapsed(9), "00:09");
        assert_eq!(format_elapsed(60), "01:00");
        assert_eq!(format_elapsed(3599), "59:59");
    }

    #[test]
    fn test_elapsed_hours() {
        assert_eq!(format_elapsed(3600), "01:00:00");
        assert_eq!(format_elapsed(36_000 + 61), "10:01:01");
        // Hours keep growing past a day rather than wrapping
        assert_eq!(format_elapsed(100 * 3600), "100:00:00");
    }

    #[test]
    fn test_duration_units() {
        assert_eq!(format_duration(59), "0m 59s");
        assert_eq!(format_duration(600), "10m 0s");
        assert_eq!(format_duration(3600), "1h 0m 0s");
        assert_eq!(format_duration(7322), "2h 2m 2s");
    }
}
