//! Meeting endpoints: create, join/leave, listings and attendance

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use meetly_common::api::{CreateMeetingRequest, JoinMeetingResponse, MeetingCodeRequest};
use meetly_common::db::{meetings, participants};
use meetly_common::db::{Meeting, MeetingParticipant, MeetingWithParticipants};
use meetly_common::time::now;
use meetly_common::AttendanceReport;
use tracing::{debug, info};

use super::auth::CurrentUser;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// POST /meetings
pub async fn create_meeting(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(req): Json<CreateMeetingRequest>,
) -> ApiResult<(StatusCode, Json<Meeting>)> {
    let meeting = meetings::create_meeting(
        &state.db,
        &current.user.id,
        &req.title,
        req.description.as_deref(),
        req.start_time,
        now(),
    )
    .await?;

    info!("{} created meeting {} ({})", current.user.username, meeting.code, meeting.title);
    Ok((StatusCode::CREATED, Json(meeting)))
}

/// PUT /meetings/join
///
/// Creates or re-activates the caller's participant row and returns a media
/// room token. The participant's `durationInSecs` seeds the client's timer.
pub async fn join_meeting(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(req): Json<MeetingCodeRequest>,
) -> ApiResult<Json<JoinMeetingResponse>> {
    let meeting = meetings::require_meeting_by_code(&state.db, &req.code).await?;
    let at = now();

    // Sign first so a signing failure leaves no active row behind
    let token = state.room_tokens.issue(&current.user, &meeting.code, at)?;
    let participant = participants::join(&state.db, &meeting, &current.user.id, at).await?;

    // Host join may have set start_time
    let meeting = meetings::find_meeting_by_id(&state.db, &meeting.id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("meeting {}", req.code)))?;

    Ok(Json(JoinMeetingResponse {
        token,
        meeting,
        participant,
    }))
}

/// PUT /meetings/leave
pub async fn leave_meeting(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(req): Json<MeetingCodeRequest>,
) -> ApiResult<Json<MeetingParticipant>> {
    let meeting = meetings::require_meeting_by_code(&state.db, &req.code).await?;
    let participant = participants::leave(&state.db, &meeting, &current.user.id, now()).await?;
    Ok(Json(participant))
}

/// GET /meetings/ongoing
pub async fn ongoing_meetings(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult<Json<Vec<MeetingWithParticipants>>> {
    Ok(Json(meetings::list_ongoing(&state.db, &current.user.id).await?))
}

/// GET /meetings/created
pub async fn created_meetings(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult<Json<Vec<MeetingWithParticipants>>> {
    Ok(Json(meetings::list_created_by(&state.db, &current.user.id).await?))
}

/// GET /meetings/meetings
pub async fn participated_meetings(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult<Json<Vec<MeetingWithParticipants>>> {
    Ok(Json(meetings::list_participated(&state.db, &current.user.id).await?))
}

/// GET /meetings/code/:code
///
/// Connected clients poll this; each call counts as the caller's sign of
/// presence in the meeting.
pub async fn meeting_by_code(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(code): Path<String>,
) -> ApiResult<Json<MeetingWithParticipants>> {
    let meeting = meetings::require_meeting_by_code(&state.db, &code).await?;
    if participants::record_heartbeat(&state.db, &meeting.id, &current.user.id, now()).await? {
        debug!("Heartbeat from {} in {}", current.user.username, meeting.code);
    }
    Ok(Json(meetings::with_participants(&state.db, meeting).await?))
}

/// GET /meetings/:id/attendance
///
/// Host only.
pub async fn meeting_attendance(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<Json<AttendanceReport>> {
    let meeting = meetings::find_meeting_by_id(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("meeting {}", id)))?;

    if !meeting.is_hosted_by(&current.user.id) {
        return Err(ApiError::Forbidden(
            "only the host can view attendance".to_string(),
        ));
    }

    let meeting = meetings::with_participants(&state.db, meeting).await?;
    Ok(Json(AttendanceReport::from_meeting(&meeting)))
}
