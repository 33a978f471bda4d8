//! File submissions: one per (user, meeting), replaced in place on resubmit

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use crate::db::models::{Submission, SubmissionWithUser, UserSummary};
use crate::ids::new_id;
use crate::{Error, Result};

/// File metadata for [`upsert_submission`]
#[derive(Debug, Clone)]
pub struct FileMetadata<'a> {
    pub file_url: &'a str,
    pub file_name: &'a str,
    pub file_type: &'a str,
    pub file_size: i64,
}

#[derive(FromRow)]
struct SubmissionUserRow {
    #[sqlx(flatten)]
    submission: Submission,
    username: String,
    email: String,
}

impl From<SubmissionUserRow> for SubmissionWithUser {
    fn from(row: SubmissionUserRow) -> Self {
        let user = UserSummary {
            id: row.submission.user_id.clone(),
            username: row.username,
            email: row.email,
        };
        Self {
            submission: row.submission,
            user,
        }
    }
}

fn validate(file: &FileMetadata<'_>) -> Result<()> {
    if file.file_url.trim().is_empty() || file.file_name.trim().is_empty() {
        return Err(Error::InvalidInput("fileUrl and fileName are required".to_string()));
    }
    if file.file_size < 0 {
        return Err(Error::InvalidInput(format!("invalid fileSize {}", file.file_size)));
    }
    Ok(())
}

/// Insert or replace the submission of `user_id` for `meeting_id`
pub async fn upsert_submission(
    pool: &SqlitePool,
    meeting_id: &str,
    user_id: &str,
    file: &FileMetadata<'_>,
    now: DateTime<Utc>,
) -> Result<Submission> {
    validate(file)?;

    sqlx::query(
        r#"
        INSERT INTO submissions (id, meeting_id, user_id, file_url, file_name, file_type, file_size, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT (user_id, meeting_id) DO UPDATE SET
            file_url = excluded.file_url,
            file_name = excluded.file_name,
            file_type = excluded.file_type,
            file_size = excluded.file_size,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(new_id())
    .bind(meeting_id)
    .bind(user_id)
    .bind(file.file_url)
    .bind(file.file_name)
    .bind(file.file_type)
    .bind(file.file_size)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    let submission = sqlx::query_as::<_, Submission>(
        r#"
        SELECT id, meeting_id, user_id, file_url, file_name, file_type, file_size, created_at, updated_at
        FROM submissions WHERE user_id = ? AND meeting_id = ?
        "#,
    )
    .bind(user_id)
    .bind(meeting_id)
    .fetch_one(pool)
    .await?;

    debug!("User {} submitted {} to meeting {}", user_id, submission.file_name, meeting_id);
    Ok(submission)
}

/// Submissions of a meeting with submitter summaries, oldest first
pub async fn list_for_meeting(pool: &SqlitePool, meeting_id: &str) -> Result<Vec<SubmissionWithUser>> {
    let rows = sqlx::query_as::<_, SubmissionUserRow>(
        r#"
        SELECT s.id, s.meeting_id, s.user_id, s.file_url, s.file_name, s.file_type, s.file_size,
               s.created_at, s.updated_at, u.username, u.email
        FROM submissions s
        JOIN users u ON u.id = s.user_id
        WHERE s.meeting_id = ?
        ORDER BY s.created_at, s.rowid
        "#,
    )
    .bind(meeting_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(SubmissionWithUser::from).collect())
}
