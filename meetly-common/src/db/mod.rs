//! Database models and queries

pub mod init;
pub mod meetings;
pub mod models;
pub mod participants;
pub mod submissions;
pub mod users;

pub use init::*;
pub use models::*;
