//! Attendance calculation
//!
//! A participant's attendance is measured against the host's attended
//! duration. The host is the participant whose user id matches the meeting
//! owner; if the host never joined, the baseline is zero and every
//! percentage is zero.

use serde::{Deserialize, Serialize};

use crate::db::models::MeetingWithParticipants;
use crate::human_time::format_duration;

/// Percentages below this are flagged as low attendance
pub const LOW_ATTENDANCE_THRESHOLD: u32 = 50;

/// Attendance of one participant relative to the host, as a whole percentage.
///
/// `round(min(participant, host) / host * 100)`, or 0 when `host_secs` is 0.
/// A participant whose recorded time exceeds the host's (clock skew, host
/// rejoined late) is capped at 100.
///
/// # Examples
///
/// ```
/// use meetly_common::attendance_percentage;
///
/// assert_eq!(attendance_percentage(300, 600), 50);
/// assert_eq!(attendance_percentage(120, 0), 0);
/// assert_eq!(attendance_percentage(150, 100), 100);
/// ```
pub fn attendance_percentage(participant_secs: u64, host_secs: u64) -> u32 {
    if host_secs == 0 {
        return 0;
    }
    let attended = participant_secs.min(host_secs) as f64;
    // Float division then round, so values match what the web client shows
    // (e.g. 23 of 40 seconds is 57.49999.. and rounds to 57)
    ((attended / host_secs as f64) * 100.0).round() as u32
}

fn non_negative(secs: i64) -> u64 {
    secs.max(0) as u64
}

/// One row of an attendance report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceEntry {
    pub participant_id: String,
    pub user_id: String,
    pub username: String,
    pub duration_in_secs: i64,
    pub duration_display: String,
    pub percentage: u32,
    pub is_host: bool,
    pub is_active: bool,
    pub low_attendance: bool,
}

/// Attendance for every participant of one meeting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceReport {
    pub meeting_id: String,
    pub title: String,
    pub host_user_id: String,
    pub host_duration_in_secs: i64,
    pub host_duration_display: String,
    pub entries: Vec<AttendanceEntry>,
}

impl AttendanceReport {
    pub fn from_meeting(meeting: &MeetingWithParticipants) -> Self {
        let host_secs = meeting
            .host_participant()
            .map(|p| p.participant.duration_in_secs)
            .unwrap_or(0)
            .max(0);

        let entries = meeting
            .participants
            .iter()
            .map(|p| {
                let duration = p.participant.duration_in_secs;
                let percentage =
                    attendance_percentage(non_negative(duration), non_negative(host_secs));
                AttendanceEntry {
                    participant_id: p.participant.id.clone(),
                    user_id: p.participant.user_id.clone(),
                    username: p.user.username.clone(),
                    duration_in_secs: duration,
                    duration_display: format_duration(non_negative(duration)),
                    percentage,
                    is_host: meeting.meeting.is_hosted_by(&p.participant.user_id),
                    is_active: p.participant.is_active,
                    low_attendance: percentage < LOW_ATTENDANCE_THRESHOLD,
                }
            })
            .collect();

        Self {
            meeting_id: meeting.meeting.id.clone(),
            title: meeting.meeting.title.clone(),
            host_user_id: meeting.meeting.user_id.clone(),
            host_duration_in_secs: host_secs,
            host_duration_display: format_duration(non_negative(host_secs)),
            entries,
        }
    }

    pub fn low_attendance_count(&self) -> usize {
        self.entries.iter().filter(|e| e.low_attendance).count()
    }
}
