//! Database models
//!
//! Field names serialize as camelCase (`durationInSecs`, `userId`, ...), which
//! is the shape the web front end and the CLI consume.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Registered user. Password material lives only in the `users` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public projection of a user embedded in participant and submission listings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    pub username: String,
    pub email: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Meeting {
    pub id: String,
    pub title: String,
    /// Unique join code (`xxx-xxxx-xxx`)
    pub code: String,
    /// Host user id
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Set when the host first joins, unless scheduled at creation
    pub start_time: Option<DateTime<Utc>>,
    /// Mirrors the host participant's attended duration
    pub duration_in_secs: i64,
    pub description: Option<String>,
}

impl Meeting {
    pub fn is_hosted_by(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }
}

/// One (user, meeting) membership with cumulative attended time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MeetingParticipant {
    pub id: String,
    pub meeting_id: String,
    pub user_id: String,
    /// Start of the current uncounted stretch while active; last join otherwise
    pub join_time: DateTime<Utc>,
    pub duration_in_secs: i64,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantWithUser {
    #[serde(flatten)]
    pub participant: MeetingParticipant,
    pub user: UserSummary,
}

/// Meeting with its participant list, as returned by the listing endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingWithParticipants {
    #[serde(flatten)]
    pub meeting: Meeting,
    pub participants: Vec<ParticipantWithUser>,
}

impl MeetingWithParticipants {
    /// The participant row belonging to the meeting's owner, if the host ever joined
    pub fn host_participant(&self) -> Option<&ParticipantWithUser> {
        self.participants
            .iter()
            .find(|p| p.participant.user_id == self.meeting.user_id)
    }

    pub fn active_count(&self) -> usize {
        self.participants
            .iter()
            .filter(|p| p.participant.is_active)
            .count()
    }
}

/// File attachment metadata; the file itself is hosted elsewhere
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: String,
    pub meeting_id: String,
    pub user_id: String,
    pub file_url: String,
    pub file_name: String,
    pub file_type: String,
    pub file_size: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionWithUser {
    #[serde(flatten)]
    pub submission: Submission,
    pub user: UserSummary,
}
