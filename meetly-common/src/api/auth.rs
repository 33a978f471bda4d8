//! Credential helpers
//!
//! Passwords are stored as `SHA-256(salt || password)` in hex alongside a
//! random per-user salt. Sessions are opaque bearer tokens stored in the
//! `sessions` table (see [`crate::db::users`]).
//!
//! Pure functions only; the HTTP layer lives in the server crate.

use rand::Rng;
use sha2::{Digest, Sha256};

/// Minimum accepted password length at registration
pub const MIN_PASSWORD_LEN: usize = 6;

/// Generate a random 16-byte salt as 32 hex characters
pub fn generate_salt() -> String {
    let bytes: [u8; 16] = rand::thread_rng().gen();
    to_hex(&bytes)
}

/// Hash a password with its salt
///
/// # Examples
///
/// ```
/// use meetly_common::api::auth::hash_password;
///
/// let hash = hash_password("hunter22", "00ff");
/// assert_eq!(hash.len(), 64); // SHA-256 is 64 hex chars
/// assert_eq!(hash, hash_password("hunter22", "00ff"));
/// ```
pub fn hash_password(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Check a password attempt against the stored hash and salt
pub fn verify_password(password: &str, salt: &str, expected_hash: &str) -> bool {
    let calculated = hash_password(password, salt);
    constant_time_eq(calculated.as_bytes(), expected_hash.as_bytes())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Extract the token from an `Authorization: Bearer <token>` header value
pub fn parse_bearer(header_value: &str) -> Option<&str> {
    let (scheme, token) = header_value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}
