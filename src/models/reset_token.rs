//! Password reset token model.
//!
//! Tokens are stored hashed with an explicit expiry; rows are deleted on
//! use, and expired rows are evicted whenever a new token is issued.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Persisted password reset token (hash only; the opaque token is never stored)
#[derive(Debug, Clone, FromRow)]
pub struct PasswordResetToken {
    pub token_hash: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl PasswordResetToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_not_expired_before_deadline() {
        let now = Utc::now();
        let token = PasswordResetToken {
            token_hash: "abc".into(),
            user_id: Uuid::nil(),
            expires_at: now + Duration::minutes(15),
            created_at: now,
        };
        assert!(!token.is_expired(now));
    }

    #[test]
    fn test_expired_after_deadline() {
        let now = Utc::now();
        let token = PasswordResetToken {
            token_hash: "abc".into(),
            user_id: Uuid::nil(),
            expires_at: now - Duration::seconds(1),
            created_at: now - Duration::minutes(16),
        };
        assert!(token.is_expired(now));
    }
}
