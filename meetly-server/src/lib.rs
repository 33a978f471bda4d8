//! meetly-server library - meeting attendance HTTP API
//!
//! Users register and sign in, hosts create meetings, participants join and
//! leave by meeting code, and hosts read attendance reports. Media transport
//! is external; joining returns a room token for it.

use axum::Router;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod checkpoint;
pub mod error;
pub mod room_token;

pub use error::{ApiError, ApiResult};
pub use room_token::{LiveKitTokenIssuer, RoomTokenIssuer};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Signs media-room tokens handed out on join
    pub room_tokens: Arc<dyn RoomTokenIssuer>,
}

impl AppState {
    pub fn new(db: SqlitePool, room_tokens: Arc<dyn RoomTokenIssuer>) -> Self {
        Self { db, room_tokens }
    }
}

/// Build application router
///
/// `/health`, `/auth/register` and `/auth/login` are public; everything else
/// requires a bearer session.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::{get, post, put};

    let protected = Router::new()
        .route("/auth/logout", post(api::logout))
        .route("/auth/me", get(api::me))
        .route("/meetings", post(api::create_meeting))
        .route("/meetings/join", put(api::join_meeting))
        .route("/meetings/leave", put(api::leave_meeting))
        .route("/meetings/ongoing", get(api::ongoing_meetings))
        .route("/meetings/created", get(api::created_meetings))
        .route("/meetings/meetings", get(api::participated_meetings))
        .route("/meetings/code/:code", get(api::meeting_by_code))
        .route("/meetings/:id/attendance", get(api::meeting_attendance))
        .route("/submissions", put(api::submit_file))
        .route("/submissions/meeting/:meeting_id", get(api::meeting_submissions))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::auth_middleware,
        ));

    let public = Router::new()
        .route("/auth/register", post(api::register))
        .route("/auth/login", post(api::login))
        .merge(api::health_routes());

    Router::new()
        .merge(protected)
        .merge(public)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
