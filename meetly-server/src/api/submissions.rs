//! Submission endpoints

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use meetly_common::api::SubmitFileRequest;
use meetly_common::db::submissions::{self, FileMetadata};
use meetly_common::db::{meetings, participants};
use meetly_common::db::{Meeting, Submission, SubmissionWithUser};
use meetly_common::time::now;

use super::auth::CurrentUser;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// The host and anyone who joined may submit to and read a meeting's files
async fn require_member(state: &AppState, meeting_id: &str, user_id: &str) -> ApiResult<Meeting> {
    let meeting = meetings::find_meeting_by_id(&state.db, meeting_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("meeting {}", meeting_id)))?;

    if meeting.is_hosted_by(user_id)
        || participants::find_participant(&state.db, meeting_id, user_id)
            .await?
            .is_some()
    {
        Ok(meeting)
    } else {
        Err(ApiError::Forbidden("not a member of this meeting".to_string()))
    }
}

/// PUT /submissions
pub async fn submit_file(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(req): Json<SubmitFileRequest>,
) -> ApiResult<Json<Submission>> {
    let meeting = require_member(&state, &req.meeting_id, &current.user.id).await?;

    let file = FileMetadata {
        file_url: &req.file_url,
        file_name: &req.file_name,
        file_type: &req.file_type,
        file_size: req.file_size,
    };
    let submission =
        submissions::upsert_submission(&state.db, &meeting.id, &current.user.id, &file, now())
            .await?;

    Ok(Json(submission))
}

/// GET /submissions/meeting/:meeting_id
pub async fn meeting_submissions(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(meeting_id): Path<String>,
) -> ApiResult<Json<Vec<SubmissionWithUser>>> {
    let meeting = require_member(&state, &meeting_id, &current.user.id).await?;
    Ok(Json(submissions::list_for_meeting(&state.db, &meeting.id).await?))
}
