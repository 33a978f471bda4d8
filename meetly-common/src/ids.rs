//! Identifier generation

use rand::distributions::Alphanumeric;
use rand::Rng;
use uuid::Uuid;

/// Generate a new row id (UUIDv4, hyphenated)
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generate a meeting join code in `xxx-xxxx-xxx` form (lowercase letters)
pub fn generate_meeting_code() -> String {
    let mut rng = rand::thread_rng();
    let mut group = |len: usize| -> String {
        (0..len)
            .map(|_| rng.gen_range(b'a'..=b'z') as char)
            .collect()
    };
    format!("{}-{}-{}", group(3), group(4), group(3))
}

/// Generate an opaque bearer session token (48 alphanumeric characters)
pub fn generate_session_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(48)
        .map(char::from)
        .collect()
}

/// Check that a string looks like a meeting code produced by [`generate_meeting_code`]
pub fn is_valid_meeting_code(code: &str) -> bool {
    let groups: Vec<&str> = code.split('-').collect();
    groups.len() == 3
        && groups[0].len() == 3
        && groups[1].len() == 4
        && groups[2].len() == 3
        && groups
            .iter()
            .all(|g| g.chars().all(|c| c.is_ascii_lowercase()))
}
