//! Participant join/leave bookkeeping
//!
//! A participant row accumulates attended seconds in `duration_in_secs`.
//! While `is_active` is set, the seconds since `join_time` are not yet
//! counted; join, leave and checkpoint fold them in and move `join_time`.
//!
//! Updates are compare-and-set on an internal `revision` column, so a leave
//! racing the periodic checkpoint can never fold the same stretch twice or
//! lose one. `duration_in_secs` only ever grows, and `join_time` never moves
//! backwards, so a skewed clock cannot open a stretch that was not attended.
//!
//! Connected clients refresh the meeting periodically; each refresh is
//! recorded in `last_seen`. A participant unseen for longer than the presence
//! timeout is credited up to `last_seen + timeout` by the checkpoint and then
//! marked inactive, as if they had left.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::db::models::{Meeting, MeetingParticipant, ParticipantWithUser, UserSummary};
use crate::ids::new_id;
use crate::time::elapsed_secs;
use crate::{Error, Result};

/// Retries of a compare-and-set update before giving up
const MAX_UPDATE_ATTEMPTS: usize = 5;

/// How long a participant may go without a refresh before the checkpoint
/// closes their session (six refresh periods)
pub const DEFAULT_PRESENCE_TIMEOUT_SECS: u64 = 60;

const SELECT_VERSIONED: &str = r#"
    SELECT id, meeting_id, user_id, join_time, duration_in_secs, is_active, revision, last_seen
    FROM meeting_participants
"#;

#[derive(Debug, FromRow)]
struct VersionedParticipant {
    #[sqlx(flatten)]
    participant: MeetingParticipant,
    revision: i64,
    /// Unix seconds
    last_seen: i64,
}

/// New state written by [`compare_and_set`]
struct ParticipantUpdate {
    join_time: DateTime<Utc>,
    duration_in_secs: i64,
    is_active: bool,
    last_seen: i64,
}

/// Result of one [`checkpoint_active`] pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CheckpointOutcome {
    /// Still-present participants whose open stretch was folded in
    pub credited: usize,
    /// Participants unseen past the presence timeout, now inactive
    pub closed: usize,
    /// Rows changed concurrently; their updater already counted the time
    pub skipped: usize,
}

#[derive(FromRow)]
struct ParticipantUserRow {
    #[sqlx(flatten)]
    participant: MeetingParticipant,
    username: String,
    email: String,
}

impl From<ParticipantUserRow> for ParticipantWithUser {
    fn from(row: ParticipantUserRow) -> Self {
        let user = UserSummary {
            id: row.participant.user_id.clone(),
            username: row.username,
            email: row.email,
        };
        Self {
            participant: row.participant,
            user,
        }
    }
}

/// Duration including the uncounted stretch of an active participant
pub fn accumulated_secs(participant: &MeetingParticipant, now: DateTime<Utc>) -> i64 {
    if participant.is_active {
        participant.duration_in_secs + elapsed_secs(participant.join_time, now)
    } else {
        participant.duration_in_secs
    }
}

async fn fetch_versioned(
    pool: &SqlitePool,
    meeting_id: &str,
    user_id: &str,
) -> Result<Option<VersionedParticipant>> {
    let sql = format!("{} WHERE meeting_id = ? AND user_id = ?", SELECT_VERSIONED);
    let row = sqlx::query_as::<_, VersionedParticipant>(&sql)
        .bind(meeting_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

/// Write the new state only if nobody else updated the row since `revision`
async fn compare_and_set(
    pool: &SqlitePool,
    current: &VersionedParticipant,
    update: ParticipantUpdate,
) -> Result<Option<MeetingParticipant>> {
    let ParticipantUpdate {
        join_time,
        duration_in_secs,
        is_active,
        last_seen,
    } = update;

    let result = sqlx::query(
        r#"
        UPDATE meeting_participants
        SET join_time = ?, duration_in_secs = ?, is_active = ?, last_seen = ?,
            revision = revision + 1
        WHERE id = ? AND revision = ?
        "#,
    )
    .bind(join_time)
    .bind(duration_in_secs)
    .bind(is_active)
    .bind(last_seen)
    .bind(&current.participant.id)
    .bind(current.revision)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }

    Ok(Some(MeetingParticipant {
        join_time,
        duration_in_secs,
        is_active,
        ..current.participant.clone()
    }))
}

/// Record `user_id` joining `meeting` at `now`.
///
/// The first join creates the row. A re-join updates the same row and keeps
/// the accumulated duration; if the row was still active (second device,
/// lost leave) the open stretch is counted before the clock restarts.
pub async fn join(
    pool: &SqlitePool,
    meeting: &Meeting,
    user_id: &str,
    now: DateTime<Utc>,
) -> Result<MeetingParticipant> {
    let inserted = sqlx::query(
        r#"
        INSERT INTO meeting_participants
            (id, meeting_id, user_id, join_time, duration_in_secs, is_active, last_seen)
        VALUES (?, ?, ?, ?, 0, 1, ?)
        ON CONFLICT (user_id, meeting_id) DO NOTHING
        "#,
    )
    .bind(new_id())
    .bind(&meeting.id)
    .bind(user_id)
    .bind(now)
    .bind(now.timestamp())
    .execute(pool)
    .await?;

    let participant = if inserted.rows_affected() == 1 {
        info!("User {} joined meeting {} for the first time", user_id, meeting.code);
        fetch_versioned(pool, &meeting.id, user_id)
            .await?
            .map(|v| v.participant)
            .ok_or_else(|| Error::Internal("participant vanished after insert".to_string()))?
    } else {
        let mut rejoined = None;
        for _ in 0..MAX_UPDATE_ATTEMPTS {
            let current = fetch_versioned(pool, &meeting.id, user_id)
                .await?
                .ok_or_else(|| Error::NotFound(format!("participant {} in {}", user_id, meeting.code)))?;
            if current.participant.is_active {
                debug!("User {} re-joined {} while still active", user_id, meeting.code);
            }
            let update = ParticipantUpdate {
                join_time: now.max(current.participant.join_time),
                duration_in_secs: accumulated_secs(&current.participant, now),
                is_active: true,
                last_seen: now.timestamp().max(current.last_seen),
            };
            if let Some(updated) = compare_and_set(pool, &current, update).await? {
                rejoined = Some(updated);
                break;
            }
        }
        let participant = rejoined.ok_or_else(|| {
            Error::Conflict(format!("concurrent updates re-joining meeting {}", meeting.code))
        })?;
        info!(
            "User {} re-joined meeting {} ({}s accumulated)",
            user_id, meeting.code, participant.duration_in_secs
        );
        participant
    };

    if meeting.is_hosted_by(user_id) {
        mark_meeting_started(pool, &meeting.id, now).await?;
        sync_meeting_duration(pool, &meeting.id, now).await?;
    }

    Ok(participant)
}

/// Record `user_id` leaving `meeting` at `now`.
///
/// Leaving an already inactive row returns it unchanged. A user who never
/// joined is [`Error::NotFound`].
pub async fn leave(
    pool: &SqlitePool,
    meeting: &Meeting,
    user_id: &str,
    now: DateTime<Utc>,
) -> Result<MeetingParticipant> {
    for _ in 0..MAX_UPDATE_ATTEMPTS {
        let current = fetch_versioned(pool, &meeting.id, user_id)
            .await?
            .ok_or_else(|| {
                Error::NotFound(format!("user has not joined meeting {}", meeting.code))
            })?;

        if !current.participant.is_active {
            debug!("User {} left {} but was not active", user_id, meeting.code);
            return Ok(current.participant);
        }

        let update = ParticipantUpdate {
            join_time: now.max(current.participant.join_time),
            duration_in_secs: accumulated_secs(&current.participant, now),
            is_active: false,
            last_seen: now.timestamp().max(current.last_seen),
        };
        if let Some(updated) = compare_and_set(pool, &current, update).await? {
            info!(
                "User {} left meeting {} ({}s attended)",
                user_id, meeting.code, updated.duration_in_secs
            );
            if meeting.is_hosted_by(user_id) {
                sync_meeting_duration(pool, &meeting.id, now).await?;
            }
            return Ok(updated);
        }
    }

    Err(Error::Conflict(format!("concurrent updates leaving meeting {}", meeting.code)))
}

/// Record a refresh from `user_id`'s client as a sign of presence.
///
/// Returns `false` when the user has no active row in the meeting. Bumps the
/// revision so a checkpoint that read the row before the refresh cannot close
/// it on stale information.
pub async fn record_heartbeat(
    pool: &SqlitePool,
    meeting_id: &str,
    user_id: &str,
    now: DateTime<Utc>,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE meeting_participants
        SET last_seen = MAX(last_seen, ?), revision = revision + 1
        WHERE meeting_id = ? AND user_id = ? AND is_active = 1
        "#,
    )
    .bind(now.timestamp())
    .bind(meeting_id)
    .bind(user_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Fold the open stretch of every active participant into its duration.
///
/// A participant seen within `presence_timeout` is credited up to `now`. One
/// unseen for longer is credited up to `last_seen + presence_timeout` and
/// marked inactive. A row changed concurrently by join/leave/refresh is
/// skipped; that operation already accounted for it.
pub async fn checkpoint_active(
    pool: &SqlitePool,
    now: DateTime<Utc>,
    presence_timeout: Duration,
) -> Result<CheckpointOutcome> {
    let sql = format!("{} WHERE is_active = 1", SELECT_VERSIONED);
    let active = sqlx::query_as::<_, VersionedParticipant>(&sql)
        .fetch_all(pool)
        .await?;

    let timeout_secs = i64::try_from(presence_timeout.as_secs()).unwrap_or(i64::MAX);
    let mut outcome = CheckpointOutcome::default();
    let mut touched_meetings = HashSet::new();
    for current in &active {
        let deadline = current.last_seen.saturating_add(timeout_secs);
        let present = now.timestamp() <= deadline;
        let credited_until = if present {
            now
        } else {
            DateTime::<Utc>::from_timestamp(deadline, 0).unwrap_or(now).min(now)
        };

        let update = ParticipantUpdate {
            join_time: credited_until.max(current.participant.join_time),
            duration_in_secs: accumulated_secs(&current.participant, credited_until),
            is_active: present,
            last_seen: current.last_seen,
        };
        match compare_and_set(pool, current, update).await? {
            Some(updated) => {
                if present {
                    outcome.credited += 1;
                } else {
                    outcome.closed += 1;
                    info!(
                        "Closed session of user {} in meeting {} (unseen since {}, {}s attended)",
                        updated.user_id, updated.meeting_id, current.last_seen, updated.duration_in_secs
                    );
                }
                touched_meetings.insert(current.participant.meeting_id.clone());
            }
            None => {
                outcome.skipped += 1;
                warn!(
                    "Skipped checkpoint of participant {} (updated concurrently)",
                    current.participant.id
                );
            }
        }
    }

    for meeting_id in &touched_meetings {
        sync_meeting_duration(pool, meeting_id, now).await?;
    }

    Ok(outcome)
}

/// Set the meeting start to `now` unless already set
async fn mark_meeting_started(pool: &SqlitePool, meeting_id: &str, now: DateTime<Utc>) -> Result<()> {
    sqlx::query("UPDATE meetings SET start_time = ?, updated_at = ? WHERE id = ? AND start_time IS NULL")
        .bind(now)
        .bind(now)
        .bind(meeting_id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Mirror the host participant's duration onto the meeting row (never decreasing)
async fn sync_meeting_duration(pool: &SqlitePool, meeting_id: &str, now: DateTime<Utc>) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE meetings
        SET duration_in_secs = MAX(
                duration_in_secs,
                COALESCE((
                    SELECT p.duration_in_secs FROM meeting_participants p
                    WHERE p.meeting_id = meetings.id AND p.user_id = meetings.user_id
                ), 0)
            ),
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(now)
    .bind(meeting_id)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn find_participant(
    pool: &SqlitePool,
    meeting_id: &str,
    user_id: &str,
) -> Result<Option<MeetingParticipant>> {
    Ok(fetch_versioned(pool, meeting_id, user_id)
        .await?
        .map(|v| v.participant))
}

/// Participants of a meeting with their user summaries, in join order
pub async fn list_for_meeting(pool: &SqlitePool, meeting_id: &str) -> Result<Vec<ParticipantWithUser>> {
    let rows = sqlx::query_as::<_, ParticipantUserRow>(
        r#"
        SELECT p.id, p.meeting_id, p.user_id, p.join_time, p.duration_in_secs, p.is_active,
               u.username, u.email
        FROM meeting_participants p
        JOIN users u ON u.id = p.user_id
        WHERE p.meeting_id = ?
        ORDER BY p.rowid
        "#,
    )
    .bind(meeting_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(ParticipantWithUser::from).collect())
}
