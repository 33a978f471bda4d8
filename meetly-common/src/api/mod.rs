//! API module for shared HTTP API functionality
//!
//! Contains only pure functions and shared types; the server wraps these in
//! axum handlers and middleware, the client uses the same types for
//! (de)serialization.

pub mod auth;
pub mod types;

pub use auth::{generate_salt, hash_password, parse_bearer, verify_password};
pub use types::{
    AuthResponse, CreateMeetingRequest, ErrorBody, ErrorResponse, HealthResponse,
    JoinMeetingResponse, LoginRequest, MeetingCodeRequest, RegisterRequest, SubmitFileRequest,
};
