//! Shared API request/response types
//!
//! Used by the server handlers and by the client, so both sides agree on the
//! JSON shape (camelCase field names).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::models::{Meeting, MeetingParticipant, User};

// ========================================
// Authentication
// ========================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Returned by register and login: the bearer token and the signed-in user
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

// ========================================
// Meetings
// ========================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMeetingRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Scheduled start; left empty the host's first join sets it
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
}

/// Body of `PUT /meetings/join` and `PUT /meetings/leave`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingCodeRequest {
    pub code: String,
}

/// Response of `PUT /meetings/join`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinMeetingResponse {
    /// Media-room access token for the real-time SDK
    pub token: String,
    pub meeting: Meeting,
    /// The caller's participant row; `durationInSecs` seeds the elapsed timer
    pub participant: MeetingParticipant,
}

// ========================================
// Submissions
// ========================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitFileRequest {
    pub meeting_id: String,
    pub file_url: String,
    pub file_name: String,
    pub file_type: String,
    pub file_size: i64,
}

// ========================================
// Health and errors
// ========================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub module: String,
    pub version: String,
}

/// Error body: `{"error": {"code": "...", "message": "..."}}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
        }
    }
}
