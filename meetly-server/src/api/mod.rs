//! HTTP API handlers for meetly-server

pub mod auth;
pub mod health;
pub mod meetings;
pub mod submissions;

pub use auth::{auth_middleware, login, logout, me, register, CurrentUser};
pub use health::health_routes;
pub use meetings::{
    create_meeting, created_meetings, join_meeting, leave_meeting, meeting_attendance,
    meeting_by_code, ongoing_meetings, participated_meetings,
};
pub use submissions::{meeting_submissions, submit_file};
