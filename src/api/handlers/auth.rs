//! Authentication handlers.

use std::sync::Arc;

use axum::{
    extract::{Extension, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

use crate::api::middleware::auth::AuthExtension;
use crate::api::SharedState;
use crate::error::{AppError, Result};
use crate::models::user::{Role, User};
use crate::services::auth_service::AuthService;

/// Create public auth routes (no auth required)
pub fn public_router() -> Router<SharedState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password", post(reset_password))
}

/// Create protected auth routes (auth required)
pub fn protected_router() -> Router<SharedState> {
    Router::new().route("/me", get(get_current_user))
}

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, ToSchema)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    /// Defaults to student; admin accounts cannot be created here
    pub role: Option<Role>,
    pub department_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: String,
    pub expires_in: u64,
    pub user: UserResponse,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub department_id: Option<Uuid>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            department_id: user.department_id,
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Register a new account
#[utoipa::path(
    post,
    path = "/signup",
    context_path = "/api/v1/auth",
    tag = "auth",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created", body = UserResponse),
        (status = 400, description = "Validation error", body = crate::api::openapi::ErrorResponse),
        (status = 409, description = "Email already registered", body = crate::api::openapi::ErrorResponse),
    )
)]
pub async fn signup(
    State(state): State<SharedState>,
    Json(payload): Json<SignupRequest>,
) -> Result<(axum::http::StatusCode, Json<UserResponse>)> {
    let auth_service = AuthService::new(state.db.clone(), Arc::new(state.config.clone()));

    let user = auth_service
        .signup(
            &payload.name,
            &payload.email,
            &payload.password,
            payload.role,
            payload.department_id,
        )
        .await?;

    Ok((axum::http::StatusCode::CREATED, Json(user.into())))
}

/// Login with credentials
#[utoipa::path(
    post,
    path = "/login",
    context_path = "/api/v1/auth",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = crate::api::openapi::ErrorResponse),
    )
)]
pub async fn login(
    State(state): State<SharedState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let auth_service = AuthService::new(state.db.clone(), Arc::new(state.config.clone()));

    let (user, issued) = auth_service
        .authenticate(&payload.email, &payload.password)
        .await?;

    Ok(Json(LoginResponse {
        token: issued.token,
        token_type: "Bearer".to_string(),
        expires_in: issued.expires_in,
        user: user.into(),
    }))
}

/// Request a password reset link
#[utoipa::path(
    post,
    path = "/forgot-password",
    context_path = "/api/v1/auth",
    tag = "auth",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Generic acknowledgement", body = MessageResponse),
    )
)]
pub async fn forgot_password(
    State(state): State<SharedState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>> {
    let auth_service = AuthService::new(state.db.clone(), Arc::new(state.config.clone()));

    auth_service.forgot_password(&payload.email).await?;

    // Same reply whether or not the account exists
    Ok(Json(MessageResponse {
        message: "If the email exists, reset instructions were sent".to_string(),
    }))
}

/// Complete a password reset
#[utoipa::path(
    post,
    path = "/reset-password",
    context_path = "/api/v1/auth",
    tag = "auth",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password updated", body = MessageResponse),
        (status = 400, description = "Invalid or expired token", body = crate::api::openapi::ErrorResponse),
    )
)]
pub async fn reset_password(
    State(state): State<SharedState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>> {
    let auth_service = AuthService::new(state.db.clone(), Arc::new(state.config.clone()));

    auth_service
        .reset_password(&payload.token, &payload.password)
        .await?;

    Ok(Json(MessageResponse {
        message: "Password reset successful".to_string(),
    }))
}

/// Get current user info
#[utoipa::path(
    get,
    path = "/me",
    context_path = "/api/v1/auth",
    tag = "auth",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 404, description = "User not found", body = crate::api::openapi::ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_current_user(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
) -> Result<Json<UserResponse>> {
    let user: User = sqlx::query_as(
        r#"
        SELECT id, name, email, password_hash, role, department_id,
               is_active, created_at, updated_at
        FROM users
        WHERE id = $1 AND is_active = true
        "#,
    )
    .bind(auth.user_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(user.into()))
}

// ---------------------------------------------------------------------------
// OpenAPI
// ---------------------------------------------------------------------------

#[derive(OpenApi)]
#[openapi(
    paths(signup, login, forgot_password, reset_password, get_current_user),
    components(schemas(
        SignupRequest,
        LoginRequest,
        LoginResponse,
        ForgotPasswordRequest,
        ResetPasswordRequest,
        MessageResponse,
        UserResponse,
    ))
)]
pub struct AuthApiDoc;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_signup_request_deserialize_defaults() {
        let json = serde_json::json!({
            "name": "Asha Rao",
            "email": "asha@example.edu",
            "password": "hunter22hunter22"
        });
        let req: SignupRequest = serde_json::from_value(json).unwrap();
        assert!(req.role.is_none());
        assert!(req.department_id.is_none());
    }

    #[test]
    fn test_signup_request_deserialize_with_role() {
        let json = serde_json::json!({
            "name": "Prof. Iyer",
            "email": "iyer@example.edu",
            "password": "hunter22hunter22",
            "role": "professor"
        });
        let req: SignupRequest = serde_json::from_value(json).unwrap();
        assert_eq!(req.role, Some(Role::Professor));
    }

    #[test]
    fn test_login_response_serialize() {
        let resp = LoginResponse {
            token: "jwt".to_string(),
            token_type: "Bearer".to_string(),
            expires_in: 604_800,
            user: UserResponse {
                id: Uuid::nil(),
                name: "Asha Rao".to_string(),
                email: "asha@example.edu".to_string(),
                role: Role::Student,
                department_id: None,
            },
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["token_type"], "Bearer");
        assert_eq!(json["user"]["role"], "student");
    }

    #[test]
    fn test_user_response_from_user_omits_hash() {
        let user = User {
            id: Uuid::nil(),
            name: "Asha Rao".to_string(),
            email: "asha@example.edu".to_string(),
            password_hash: "$2b$12$secret".to_string(),
            role: Role::Student,
            department_id: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let resp: UserResponse = user.into();
        let json = serde_json::to_value(&resp).unwrap();
        assert!(json.get("password_hash").is_none());
    }

    #[test]
    fn test_reset_password_request_deserialize() {
        let json = serde_json::json!({ "token": "aabb", "password": "new-password-1" });
        let req: ResetPasswordRequest = serde_json::from_value(json).unwrap();
        assert_eq!(req.token, "aabb");
    }
}
