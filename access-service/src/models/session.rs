//! Session model - opaque-token login sessions.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use sqlx::FromRow;
use uuid::Uuid;

/// Bytes of OS entropy behind every session token.
const TOKEN_ENTROPY_BYTES: usize = 32;

/// Session entity. Sessions are deactivated on logout, expiry detection,
/// or owner deactivation - never deleted, so the table doubles as an
/// audit trail.
#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub session_id: Uuid,
    pub user_id: Uuid,
    pub session_key: String,
    pub expiry_utc: DateTime<Utc>,
    pub is_active: bool,
    pub created_utc: DateTime<Utc>,
}

impl Session {
    /// Create a new active session with a fresh random token and
    /// `now + ttl_minutes` expiry.
    pub fn new(user_id: Uuid, ttl_minutes: i64) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            user_id,
            session_key: generate_session_token(),
            expiry_utc: Utc::now() + Duration::minutes(ttl_minutes),
            is_active: true,
            created_utc: Utc::now(),
        }
    }

    /// A session is dead once its expiry has passed or it has been
    /// deactivated.
    pub fn is_expired(&self) -> bool {
        !self.is_active || self.expiry_utc <= Utc::now()
    }
}

/// Generate a cryptographically random, URL-safe session token.
pub fn generate_session_token() -> String {
    let mut bytes = [0u8; TOKEN_ENTROPY_BYTES];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_unique_and_url_safe() {
        let a = generate_session_token();
        let b = generate_session_token();
        assert_ne!(a, b);
        // 32 bytes of entropy -> 43 base64url chars without padding
        assert_eq!(a.len(), 43);
        assert!(a
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn fresh_session_is_live() {
        let session = Session::new(Uuid::new_v4(), 60);
        assert!(session.is_active);
        assert!(!session.is_expired());
    }

    #[test]
    fn expiry_in_the_past_means_expired() {
        let mut session = Session::new(Uuid::new_v4(), 60);
        session.expiry_utc = Utc::now() - Duration::minutes(1);
        assert!(session.is_expired());
    }

    #[test]
    fn deactivated_session_counts_as_expired() {
        let mut session = Session::new(Uuid::new_v4(), 60);
        session.is_active = false;
        assert!(session.is_expired());
    }
}
