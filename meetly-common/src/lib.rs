//! # Meetly Common Library
//!
//! Shared code for the Meetly server and client including:
//! - Domain models (users, meetings, participants, submissions)
//! - SQLite persistence and participant duration bookkeeping
//! - Attendance percentage calculation and reports
//! - API request/response types and credential helpers
//! - Configuration loading
//! - Time formatting utilities

pub mod api;
pub mod attendance;
pub mod config;
pub mod db;
pub mod error;
pub mod human_time;
pub mod ids;
pub mod time;

pub use attendance::{attendance_percentage, AttendanceEntry, AttendanceReport};
pub use error::{Error, Result};
