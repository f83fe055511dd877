//! Authentication service.
//!
//! Handles signup, credential verification, JWT issuance/validation,
//! password hashing, and the persisted password reset token flow.

use std::sync::Arc;

use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::reset_token::PasswordResetToken;
use crate::models::user::{Role, User};

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: Uuid,
    /// Display name
    pub name: String,
    /// Role at issuance time
    pub role: Role,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

/// Issued bearer token
#[derive(Debug, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub expires_in: u64,
}

const SELECT_USER: &str = r#"
    SELECT id, name, email, password_hash, role, department_id,
           is_active, created_at, updated_at
    FROM users
"#;

/// Authentication service
pub struct AuthService {
    db: PgPool,
    config: Arc<Config>,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl AuthService {
    /// Create a new authentication service
    pub fn new(db: PgPool, config: Arc<Config>) -> Self {
        let secret = config.jwt_secret.clone();
        Self {
            db,
            config,
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Register a new account. Roles are limited to non-admin; admins are
    /// provisioned at boot or by an existing admin.
    pub async fn signup(
        &self,
        name: &str,
        email: &str,
        password: &str,
        role: Option<Role>,
        department_id: Option<Uuid>,
    ) -> Result<User> {
        if name.trim().is_empty() || email.trim().is_empty() {
            return Err(AppError::Validation("name and email are required".into()));
        }
        if !email.contains('@') {
            return Err(AppError::Validation("invalid email address".into()));
        }
        validate_password(password)?;

        let role = role.unwrap_or(Role::Student);
        if role.is_admin() {
            return Err(AppError::Validation(
                "admin accounts cannot be created via signup".into(),
            ));
        }

        let password_hash = Self::hash_password(password)?;

        let user: User = sqlx::query_as(
            r#"
            INSERT INTO users (name, email, password_hash, role, department_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, email, password_hash, role, department_id,
                      is_active, created_at, updated_at
            "#,
        )
        .bind(name.trim())
        .bind(email.trim())
        .bind(&password_hash)
        .bind(role)
        .bind(department_id)
        .fetch_one(&self.db)
        .await
        .map_err(|e| {
            if e.to_string().contains("duplicate key") {
                AppError::Conflict("an account with this email already exists".into())
            } else {
                AppError::Database(e.to_string())
            }
        })?;

        tracing::info!(user = %user.id, role = role.as_str(), "User registered");

        Ok(user)
    }

    /// Authenticate with email and password
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<(User, IssuedToken)> {
        let user: User = sqlx::query_as(&format!(
            "{} WHERE email = $1 AND is_active = true",
            SELECT_USER
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::Authentication("Invalid email or password".to_string()))?;

        if !Self::verify_password(password, &user.password_hash)? {
            return Err(AppError::Authentication(
                "Invalid email or password".to_string(),
            ));
        }

        let token = self.generate_token(&user)?;

        Ok((user, token))
    }

    /// Generate a bearer token for a user
    pub fn generate_token(&self, user: &User) -> Result<IssuedToken> {
        let now = Utc::now();
        let exp = now + Duration::days(self.config.jwt_expiry_days);

        let claims = Claims {
            sub: user.id,
            name: user.name.clone(),
            role: user.role,
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Token encoding failed: {}", e)))?;

        Ok(IssuedToken {
            token,
            expires_in: (self.config.jwt_expiry_days * 86_400) as u64,
        })
    }

    /// Validate and decode a bearer token
    pub fn validate_token(&self, token: &str) -> Result<Claims> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map_err(|e| AppError::Authentication(format!("Invalid token: {}", e)))?;

        Ok(token_data.claims)
    }

    /// Begin a password reset. Always succeeds from the caller's point of
    /// view so account existence is not disclosed; when the account exists a
    /// token is persisted (hashed, with TTL) and the reset link is logged
    /// for the deployment's mail relay to pick up.
    pub async fn forgot_password(&self, email: &str) -> Result<()> {
        let user_id: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM users WHERE email = $1 AND is_active = true")
                .bind(email)
                .fetch_optional(&self.db)
                .await?;

        let Some(user_id) = user_id else {
            return Ok(());
        };

        let mut bytes = [0u8; 32];
        rand::rng().fill_bytes(&mut bytes);
        let token = hex::encode(bytes);
        let token_hash = hash_reset_token(&token);
        let expires_at = Utc::now() + Duration::minutes(self.config.reset_token_ttl_minutes);

        // Evict expired rows before inserting; tokens never pile up.
        sqlx::query("DELETE FROM password_reset_tokens WHERE expires_at < NOW()")
            .execute(&self.db)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO password_reset_tokens (token_hash, user_id, expires_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(&token_hash)
        .bind(user_id)
        .bind(expires_at)
        .execute(&self.db)
        .await?;

        let base = self
            .config
            .frontend_url
            .as_deref()
            .unwrap_or("http://localhost:5173");
        tracing::info!(
            user = %user_id,
            reset_url = format!("{}/reset-password?token={}", base, token),
            "Password reset requested"
        );

        Ok(())
    }

    /// Complete a password reset. The token is consumed on success.
    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<()> {
        validate_password(new_password)?;

        let token_hash = hash_reset_token(token);

        let stored: PasswordResetToken = sqlx::query_as(
            r#"
            SELECT token_hash, user_id, expires_at, created_at
            FROM password_reset_tokens
            WHERE token_hash = $1
            "#,
        )
        .bind(&token_hash)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::Validation("invalid or expired reset token".to_string()))?;

        if stored.is_expired(Utc::now()) {
            sqlx::query("DELETE FROM password_reset_tokens WHERE token_hash = $1")
                .bind(&token_hash)
                .execute(&self.db)
                .await?;
            return Err(AppError::Validation(
                "invalid or expired reset token".to_string(),
            ));
        }

        let password_hash = Self::hash_password(new_password)?;

        sqlx::query("UPDATE users SET password_hash = $1, updated_at = NOW() WHERE id = $2")
            .bind(&password_hash)
            .bind(stored.user_id)
            .execute(&self.db)
            .await?;

        sqlx::query("DELETE FROM password_reset_tokens WHERE token_hash = $1")
            .bind(&token_hash)
            .execute(&self.db)
            .await?;

        tracing::info!(user = %stored.user_id, "Password reset completed");

        Ok(())
    }

    /// Hash a password
    pub fn hash_password(password: &str) -> Result<String> {
        hash(password, DEFAULT_COST)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
    }

    /// Verify a password against a hash
    pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
        verify(password, hash)
            .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))
    }
}

fn validate_password(password: &str) -> Result<()> {
    if password.len() < 8 {
        return Err(AppError::Validation(
            "password must be at least 8 characters".into(),
        ));
    }
    Ok(())
}

/// Reset tokens are stored as the SHA-256 of the opaque token, so a leaked
/// table cannot be replayed.
fn hash_reset_token(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}
