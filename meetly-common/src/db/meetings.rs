//! Meeting rows and the listing queries behind the meeting endpoints

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, warn};

use crate::db::models::{Meeting, MeetingWithParticipants};
use crate::db::participants;
use crate::ids::{generate_meeting_code, new_id};
use crate::{Error, Result};

/// Attempts at drawing an unused join code
const MAX_CODE_ATTEMPTS: usize = 8;

const SELECT_MEETING: &str = r#"
    SELECT m.id, m.title, m.code, m.user_id, m.created_at, m.updated_at,
           m.start_time, m.duration_in_secs, m.description
    FROM meetings m
"#;

/// Create a meeting hosted by `host_id` with a freshly generated join code
pub async fn create_meeting(
    pool: &SqlitePool,
    host_id: &str,
    title: &str,
    description: Option<&str>,
    start_time: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<Meeting> {
    let title = title.trim();
    if title.is_empty() {
        return Err(Error::InvalidInput("meeting title must not be empty".to_string()));
    }
    let description = description
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string);

    for attempt in 1..=MAX_CODE_ATTEMPTS {
        let meeting = Meeting {
            id: new_id(),
            title: title.to_string(),
            code: generate_meeting_code(),
            user_id: host_id.to_string(),
            created_at: now,
            updated_at: now,
            start_time,
            duration_in_secs: 0,
            description: description.clone(),
        };

        let inserted = sqlx::query(
            r#"
            INSERT INTO meetings (id, title, code, user_id, created_at, updated_at, start_time, duration_in_secs, description)
            VALUES (?, ?, ?, ?, ?, ?, ?, 0, ?)
            "#,
        )
        .bind(&meeting.id)
        .bind(&meeting.title)
        .bind(&meeting.code)
        .bind(&meeting.user_id)
        .bind(meeting.created_at)
        .bind(meeting.updated_at)
        .bind(meeting.start_time)
        .bind(&meeting.description)
        .execute(pool)
        .await
        .map_err(|e| Error::from_unique_violation(e, "meeting code"));

        match inserted {
            Ok(_) => {
                debug!("Created meeting {} ({}) for host {}", meeting.code, meeting.id, host_id);
                return Ok(meeting);
            }
            Err(Error::Conflict(_)) => {
                warn!("Meeting code collision on attempt {}, retrying", attempt);
            }
            Err(e) => return Err(e),
        }
    }

    Err(Error::Internal("could not allocate a unique meeting code".to_string()))
}

pub async fn find_meeting_by_id(pool: &SqlitePool, id: &str) -> Result<Option<Meeting>> {
    let sql = format!("{} WHERE m.id = ?", SELECT_MEETING);
    let meeting = sqlx::query_as::<_, Meeting>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(meeting)
}

pub async fn find_meeting_by_code(pool: &SqlitePool, code: &str) -> Result<Option<Meeting>> {
    let sql = format!("{} WHERE m.code = ?", SELECT_MEETING);
    let meeting = sqlx::query_as::<_, Meeting>(&sql)
        .bind(code.trim().to_lowercase())
        .fetch_optional(pool)
        .await?;

    Ok(meeting)
}

/// Look up a meeting by code, treating absence as [`Error::NotFound`]
pub async fn require_meeting_by_code(pool: &SqlitePool, code: &str) -> Result<Meeting> {
    find_meeting_by_code(pool, code)
        .await?
        .ok_or_else(|| Error::NotFound(format!("meeting {}", code)))
}

/// Attach the participant list (with user summaries) to a meeting
pub async fn with_participants(pool: &SqlitePool, meeting: Meeting) -> Result<MeetingWithParticipants> {
    let participants = participants::list_for_meeting(pool, &meeting.id).await?;
    Ok(MeetingWithParticipants {
        meeting,
        participants,
    })
}

async fn attach_all(pool: &SqlitePool, meetings: Vec<Meeting>) -> Result<Vec<MeetingWithParticipants>> {
    let mut out = Vec::with_capacity(meetings.len());
    for meeting in meetings {
        out.push(with_participants(pool, meeting).await?);
    }
    Ok(out)
}

/// Meetings hosted by `user_id`, newest first
pub async fn list_created_by(pool: &SqlitePool, user_id: &str) -> Result<Vec<MeetingWithParticipants>> {
    let sql = format!("{} WHERE m.user_id = ? ORDER BY m.created_at DESC", SELECT_MEETING);
    let meetings = sqlx::query_as::<_, Meeting>(&sql)
        .bind(user_id)
        .fetch_all(pool)
        .await?;

    attach_all(pool, meetings).await
}

/// Meetings `user_id` has a participant row in, newest first
pub async fn list_participated(pool: &SqlitePool, user_id: &str) -> Result<Vec<MeetingWithParticipants>> {
    let sql = format!(
        r#"{} WHERE EXISTS (
            SELECT 1 FROM meeting_participants p
            WHERE p.meeting_id = m.id AND p.user_id = ?
        )
        ORDER BY m.created_at DESC"#,
        SELECT_MEETING
    );
    let meetings = sqlx::query_as::<_, Meeting>(&sql)
        .bind(user_id)
        .fetch_all(pool)
        .await?;

    attach_all(pool, meetings).await
}

/// Meetings with at least one active participant that `user_id` hosts or has joined
pub async fn list_ongoing(pool: &SqlitePool, user_id: &str) -> Result<Vec<MeetingWithParticipants>> {
    let sql = format!(
        r#"{} WHERE EXISTS (
            SELECT 1 FROM meeting_participants a
            WHERE a.meeting_id = m.id AND a.is_active = 1
        )
        AND (
            m.user_id = ?
            OR EXISTS (
                SELECT 1 FROM meeting_participants p
                WHERE p.meeting_id = m.id AND p.user_id = ?
            )
        )
        ORDER BY m.created_at DESC"#,
        SELECT_MEETING
    );
    let meetings = sqlx::query_as::<_, Meeting>(&sql)
        .bind(user_id)
        .bind(user_id)
        .fetch_all(pool)
        .await?;

    attach_all(pool, meetings).await
}
