//! meetly-client library
//!
//! HTTP client for meetly-server and the live session tracker used while a
//! participant is in a meeting.

pub mod api;
pub mod error;
pub mod session;

pub use api::{HttpMeetingApi, MeetingApi};
pub use error::{ClientError, Result};
pub use session::{MeetingSession, SessionConfig};
