//! Media-room access tokens
//!
//! The media transport is an external LiveKit deployment. Joining a meeting
//! hands the caller a short-lived HS256 token granting `roomJoin` on the room
//! named after the meeting code.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use meetly_common::config::LiveKitSection;
use meetly_common::db::User;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Upper bound on the configured token lifetime (30 days)
const MAX_TTL_SECS: u64 = 30 * 24 * 60 * 60;

/// Issues tokens that let a user into a meeting's media room
pub trait RoomTokenIssuer: Send + Sync {
    fn issue(&self, user: &User, room: &str, now: DateTime<Utc>) -> Result<String, ApiError>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoGrant {
    pub room: String,
    pub room_join: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomClaims {
    pub iss: String,
    pub sub: String,
    pub name: String,
    pub nbf: i64,
    pub exp: i64,
    pub video: VideoGrant,
}

/// LiveKit-compatible access token signer
pub struct LiveKitTokenIssuer {
    api_key: String,
    encoding_key: EncodingKey,
    ttl: Duration,
}

impl LiveKitTokenIssuer {
    pub fn new(config: &LiveKitSection) -> Self {
        Self {
            api_key: config.api_key.clone(),
            encoding_key: EncodingKey::from_secret(config.api_secret.as_bytes()),
            ttl: Duration::seconds(config.token_ttl_secs.min(MAX_TTL_SECS) as i64),
        }
    }

    pub fn claims(&self, user: &User, room: &str, now: DateTime<Utc>) -> RoomClaims {
        RoomClaims {
            iss: self.api_key.clone(),
            sub: user.id.clone(),
            name: user.username.clone(),
            nbf: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
            video: VideoGrant {
                room: room.to_string(),
                room_join: true,
            },
        }
    }
}

impl RoomTokenIssuer for LiveKitTokenIssuer {
    fn issue(&self, user: &User, room: &str, now: DateTime<Utc>) -> Result<String, ApiError> {
        encode(&Header::default(), &self.claims(user, room, now), &self.encoding_key)
            .map_err(|e| ApiError::Internal(format!("Failed to sign room token: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

    fn user() -> User {
        let now = Utc::now();
        User {
            id: "user-1".to_string(),
            username: "ada".to_string(),
            email: "ada@example.com".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_token_carries_room_grant() {
        let config = LiveKitSection {
            api_key: "APIkey".to_string(),
            api_secret: "s3cret".to_string(),
            token_ttl_secs: 600,
            ..LiveKitSection::default()
        };
        let issuer = LiveKitTokenIssuer::new(&config);
        let now = Utc::now();

        let token = issuer.issue(&user(), "abc-defg-hij", now).unwrap();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&["APIkey"]);
        let decoded = decode::<RoomClaims>(
            &token,
            &DecodingKey::from_secret(b"s3cret"),
            &validation,
        )
        .unwrap();

        assert_eq!(decoded.claims.sub, "user-1");
        assert_eq!(decoded.claims.name, "ada");
        assert_eq!(decoded.claims.video.room, "abc-defg-hij");
        assert!(decoded.claims.video.room_join);
        assert_eq!(decoded.claims.exp - decoded.claims.nbf, 600);
    }

    #[test]
    fn test_grant_serializes_camel_case() {
        let grant = VideoGrant {
            room: "r".to_string(),
            room_join: true,
        };
        let value = serde_json::to_value(grant).unwrap();
        assert_eq!(value["roomJoin"], true);
    }
}
