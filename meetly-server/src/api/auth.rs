//! Registration, sign-in and the bearer session middleware
//!
//! Sessions are opaque random tokens stored in the `sessions` table and sent
//! as `Authorization: Bearer <token>`.

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::Response,
    Extension, Json,
};
use meetly_common::api::{parse_bearer, AuthResponse, LoginRequest, RegisterRequest};
use meetly_common::db::users;
use meetly_common::db::User;
use meetly_common::time::now;
use tracing::{debug, info, warn};

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// The authenticated caller, inserted into request extensions by [`auth_middleware`]
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    pub token: String,
}

/// Authentication middleware
///
/// Resolves the bearer token to a user or rejects with 401. Applied to
/// protected routes only.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_bearer)
        .map(str::to_string)
        .ok_or_else(|| ApiError::Unauthorized("missing bearer token".to_string()))?;

    let user = users::find_user_by_session(&state.db, &token)
        .await?
        .ok_or_else(|| {
            warn!("Rejected unknown session token");
            ApiError::Unauthorized("invalid or expired session".to_string())
        })?;

    request.extensions_mut().insert(CurrentUser { user, token });
    Ok(next.run(request).await)
}

/// POST /auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    let at = now();
    let user = users::create_user(&state.db, &req.username, &req.email, &req.password, at).await?;
    let token = users::create_session(&state.db, &user.id, at).await?;

    info!("Registered user {}", user.username);
    Ok((StatusCode::CREATED, Json(AuthResponse { token, user })))
}

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let user = users::authenticate(&state.db, &req.email, &req.password).await?;
    let token = users::create_session(&state.db, &user.id, now()).await?;

    debug!("User {} signed in", user.username);
    Ok(Json(AuthResponse { token, user }))
}

/// POST /auth/logout
pub async fn logout(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult<StatusCode> {
    users::delete_session(&state.db, &current.token).await?;
    debug!("User {} signed out", current.user.username);
    Ok(StatusCode::NO_CONTENT)
}

/// GET /auth/me
pub async fn me(Extension(current): Extension<CurrentUser>) -> Json<User> {
    Json(current.user)
}
