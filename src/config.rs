//! Application configuration loaded from environment variables.

use crate::error::{AppError, Result};
use std::env;

/// Application configuration
#[derive(Clone)]
pub struct Config {
    /// Database connection URL
    pub database_url: String,

    /// Server bind address (host:port)
    pub bind_address: String,

    /// Log level
    pub log_level: String,

    /// Directory where uploaded assignment files are stored
    pub upload_path: String,

    /// Maximum accepted upload size in bytes
    pub max_upload_bytes: usize,

    /// JWT secret key for signing tokens
    pub jwt_secret: String,

    /// JWT token expiry in days
    pub jwt_expiry_days: i64,

    /// Password reset token time-to-live in minutes
    pub reset_token_ttl_minutes: i64,

    /// Comma-separated CORS origins (development only; unset = allow any)
    pub cors_origins: Option<String>,

    /// Frontend base URL used to build password reset links
    pub frontend_url: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .map_err(|_| AppError::Config("DATABASE_URL not set".into()))?,
            bind_address: env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".into()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            upload_path: env::var("UPLOAD_PATH")
                .unwrap_or_else(|_| "/var/lib/coursedesk/uploads".into()),
            max_upload_bytes: env::var("MAX_UPLOAD_BYTES")
                .unwrap_or_else(|_| "26214400".into())
                .parse()
                .unwrap_or(26_214_400),
            jwt_secret: env::var("JWT_SECRET")
                .map_err(|_| AppError::Config("JWT_SECRET not set".into()))?,
            jwt_expiry_days: env::var("JWT_EXPIRY_DAYS")
                .unwrap_or_else(|_| "7".into())
                .parse()
                .unwrap_or(7),
            reset_token_ttl_minutes: env::var("RESET_TOKEN_TTL_MINUTES")
                .unwrap_or_else(|_| "15".into())
                .parse()
                .unwrap_or(15),
            cors_origins: env::var("CORS_ORIGINS").ok(),
            frontend_url: env::var("FRONTEND_URL").ok(),
        })
    }
}

// Manual Debug so the JWT secret never ends up in logs.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &self.database_url)
            .field("bind_address", &self.bind_address)
            .field("log_level", &self.log_level)
            .field("upload_path", &self.upload_path)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("jwt_secret", &"[REDACTED]")
            .field("jwt_expiry_days", &self.jwt_expiry_days)
            .field("reset_token_ttl_minutes", &self.reset_token_ttl_minutes)
            .field("cors_origins", &self.cors_origins)
            .field("frontend_url", &self.frontend_url)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            database_url: "postgres://localhost/coursedesk".into(),
            bind_address: "0.0.0.0:8080".into(),
            log_level: "info".into(),
            upload_path: "/tmp/uploads".into(),
            max_upload_bytes: 26_214_400,
            jwt_secret: "super-secret-signing-key".into(),
            jwt_expiry_days: 7,
            reset_token_ttl_minutes: 15,
            cors_origins: None,
            frontend_url: None,
        }
    }

    #[test]
    fn test_debug_redacts_jwt_secret() {
        let output = format!("{:?}", test_config());
        assert!(!output.contains("super-secret-signing-key"));
        assert!(output.contains("[REDACTED]"));
        assert!(output.contains("0.0.0.0:8080"));
    }
}
