//! User management handlers (admin only).

use axum::{
    extract::{Extension, Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, OpenApi, ToSchema};
use uuid::Uuid;

use crate::api::dto::{Pagination, PaginationQuery};
use crate::api::middleware::auth::AuthExtension;
use crate::api::SharedState;
use crate::error::{AppError, Result};
use crate::models::user::{Role, User};
use crate::services::auth_service::AuthService;

/// Create user routes
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route(
            "/:id",
            get(get_user).patch(update_user).delete(delete_user),
        )
}

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListUsersQuery {
    pub role: Option<Role>,
    pub department_id: Option<Uuid>,
    /// Substring match on name or email
    pub search: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl ListUsersQuery {
    fn pagination(&self) -> PaginationQuery {
        PaginationQuery {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    /// Auto-generated when not provided
    pub password: Option<String>,
    pub role: Role,
    pub department_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub role: Option<Role>,
    pub department_id: Option<Uuid>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AdminUserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub department_id: Option<Uuid>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for AdminUserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            department_id: user.department_id,
            is_active: user.is_active,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreateUserResponse {
    pub user: AdminUserResponse,
    /// Present only when the password was auto-generated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_password: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserListResponse {
    pub items: Vec<AdminUserResponse>,
    pub pagination: Pagination,
}

/// Generate a random initial password
pub(crate) fn generate_password() -> String {
    use rand::Rng;
    const CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZabcdefghjkmnpqrstuvwxyz23456789!@#$%&*";
    let mut rng = rand::rng();
    (0..16)
        .map(|_| {
            let idx = rng.random_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}

const SELECT_USER: &str = r#"
    SELECT id, name, email, password_hash, role, department_id,
           is_active, created_at, updated_at
    FROM users
"#;

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// List users with optional role/department/search filters.
#[utoipa::path(
    get,
    path = "/",
    context_path = "/api/v1/users",
    tag = "users",
    params(ListUsersQuery),
    responses(
        (status = 200, description = "User list", body = UserListResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_users(
    State(state): State<SharedState>,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<UserListResponse>> {
    // Build WHERE clauses dynamically
    let mut conditions: Vec<String> = vec![];
    let mut bind_idx = 1u32;

    if query.role.is_some() {
        conditions.push(format!("role = ${}", bind_idx));
        bind_idx += 1;
    }
    if query.department_id.is_some() {
        conditions.push(format!("department_id = ${}", bind_idx));
        bind_idx += 1;
    }
    if query.search.is_some() {
        conditions.push(format!(
            "(name ILIKE ${} OR email ILIKE ${})",
            bind_idx, bind_idx
        ));
        bind_idx += 1;
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    };

    let list_sql = format!(
        "{}{} ORDER BY created_at DESC LIMIT ${} OFFSET ${}",
        SELECT_USER,
        where_clause,
        bind_idx,
        bind_idx + 1
    );
    let count_sql = format!("SELECT COUNT(*) FROM users{}", where_clause);

    let mut list_query = sqlx::query_as::<_, User>(&list_sql);
    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);

    if let Some(role) = query.role {
        list_query = list_query.bind(role);
        count_query = count_query.bind(role);
    }
    if let Some(department_id) = query.department_id {
        list_query = list_query.bind(department_id);
        count_query = count_query.bind(department_id);
    }
    if let Some(ref search) = query.search {
        let pattern = format!("%{}%", search);
        list_query = list_query.bind(pattern.clone());
        count_query = count_query.bind(pattern);
    }

    let pagination = query.pagination();
    let rows = list_query
        .bind(pagination.per_page() as i64)
        .bind(pagination.offset())
        .fetch_all(&state.db)
        .await?;

    let total = count_query.fetch_one(&state.db).await?;

    Ok(Json(UserListResponse {
        items: rows.into_iter().map(AdminUserResponse::from).collect(),
        pagination: Pagination::from_query_and_total(&pagination, total),
    }))
}

/// Create a user. The password is generated when not supplied.
#[utoipa::path(
    post,
    path = "/",
    context_path = "/api/v1/users",
    tag = "users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = CreateUserResponse),
        (status = 409, description = "Email already registered", body = crate::api::openapi::ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_user(
    State(state): State<SharedState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(axum::http::StatusCode, Json<CreateUserResponse>)> {
    if payload.name.trim().is_empty() || !payload.email.contains('@') {
        return Err(AppError::Validation(
            "a name and a valid email are required".into(),
        ));
    }

    let (password, generated) = match payload.password {
        Some(p) => (p, None),
        None => {
            let p = generate_password();
            (p.clone(), Some(p))
        }
    };
    let password_hash = AuthService::hash_password(&password)?;

    let user: User = sqlx::query_as(
        r#"
        INSERT INTO users (name, email, password_hash, role, department_id)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, name, email, password_hash, role, department_id,
                  is_active, created_at, updated_at
        "#,
    )
    .bind(payload.name.trim())
    .bind(payload.email.trim())
    .bind(&password_hash)
    .bind(payload.role)
    .bind(payload.department_id)
    .fetch_one(&state.db)
    .await
    .map_err(|e| {
        if e.to_string().contains("duplicate key") {
            AppError::Conflict("an account with this email already exists".into())
        } else {
            AppError::Database(e.to_string())
        }
    })?;

    tracing::info!(user = %user.id, role = payload.role.as_str(), "User created by admin");

    Ok((
        axum::http::StatusCode::CREATED,
        Json(CreateUserResponse {
            user: user.into(),
            generated_password: generated,
        }),
    ))
}

/// Get a single user.
#[utoipa::path(
    get,
    path = "/{id}",
    context_path = "/api/v1/users",
    tag = "users",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User details", body = AdminUserResponse),
        (status = 404, description = "User not found", body = crate::api::openapi::ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_user(
    State(state): State<SharedState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<AdminUserResponse>> {
    let user: User = sqlx::query_as(&format!("{} WHERE id = $1", SELECT_USER))
        .bind(user_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(user.into()))
}

/// Update a user's name, role, department, or active flag.
#[utoipa::path(
    patch,
    path = "/{id}",
    context_path = "/api/v1/users",
    tag = "users",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = AdminUserResponse),
        (status = 404, description = "User not found", body = crate::api::openapi::ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_user(
    State(state): State<SharedState>,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<AdminUserResponse>> {
    let user: User = sqlx::query_as(
        r#"
        UPDATE users
        SET name = COALESCE($2, name),
            role = COALESCE($3, role),
            department_id = COALESCE($4, department_id),
            is_active = COALESCE($5, is_active),
            updated_at = NOW()
        WHERE id = $1
        RETURNING id, name, email, password_hash, role, department_id,
                  is_active, created_at, updated_at
        "#,
    )
    .bind(user_id)
    .bind(payload.name.as_deref().map(str::trim))
    .bind(payload.role)
    .bind(payload.department_id)
    .bind(payload.is_active)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(user.into()))
}

/// Delete a user. Self-deletion is refused.
#[utoipa::path(
    delete,
    path = "/{id}",
    context_path = "/api/v1/users",
    tag = "users",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 404, description = "User not found", body = crate::api::openapi::ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_user(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path(user_id): Path<Uuid>,
) -> Result<axum::http::StatusCode> {
    if auth.user_id == user_id {
        return Err(AppError::Validation(
            "you cannot delete your own account".into(),
        ));
    }

    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user_id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    tracing::info!(user = %user_id, deleted_by = %auth.user_id, "User deleted");

    Ok(axum::http::StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// OpenAPI
// ---------------------------------------------------------------------------

#[derive(OpenApi)]
#[openapi(
    paths(list_users, create_user, get_user, update_user, delete_user),
    components(schemas(
        CreateUserRequest,
        UpdateUserRequest,
        AdminUserResponse,
        CreateUserResponse,
        UserListResponse,
    ))
)]
pub struct UsersApiDoc;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
