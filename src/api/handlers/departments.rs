//! Department management handlers.
//!
//! Reads are available to any authenticated user (signup forms and
//! assignment drafts need the list); writes are admin only, checked in the
//! handlers.

use axum::{
    extract::{Extension, Path, State},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

use crate::api::middleware::auth::AuthExtension;
use crate::api::SharedState;
use crate::error::{AppError, Result};
use crate::models::department::Department;

/// Create department routes
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", get(list_departments).post(create_department))
        .route(
            "/:id",
            get(get_department)
                .patch(update_department)
                .delete(delete_department),
        )
}

fn require_admin(auth: &AuthExtension) -> Result<()> {
    if !auth.role.is_admin() {
        return Err(AppError::Authorization(
            "only admins may manage departments".to_string(),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateDepartmentRequest {
    pub name: String,
    pub code: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateDepartmentRequest {
    pub name: Option<String>,
    pub code: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DepartmentResponse {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Department> for DepartmentResponse {
    fn from(d: Department) -> Self {
        Self {
            id: d.id,
            name: d.name,
            code: d.code,
            created_at: d.created_at,
            updated_at: d.updated_at,
        }
    }
}

const SELECT_DEPARTMENT: &str =
    "SELECT id, name, code, created_at, updated_at FROM departments";

fn map_duplicate(e: sqlx::Error) -> AppError {
    if e.to_string().contains("duplicate key") {
        AppError::Conflict("a department with this name or code already exists".into())
    } else {
        AppError::Database(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// List all departments.
#[utoipa::path(
    get,
    path = "/",
    context_path = "/api/v1/departments",
    tag = "departments",
    responses(
        (status = 200, description = "Department list", body = [DepartmentResponse]),
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_departments(
    State(state): State<SharedState>,
) -> Result<Json<Vec<DepartmentResponse>>> {
    let rows: Vec<Department> =
        sqlx::query_as(&format!("{} ORDER BY name", SELECT_DEPARTMENT))
            .fetch_all(&state.db)
            .await?;

    Ok(Json(rows.into_iter().map(DepartmentResponse::from).collect()))
}

/// Get a single department.
#[utoipa::path(
    get,
    path = "/{id}",
    context_path = "/api/v1/departments",
    tag = "departments",
    params(("id" = Uuid, Path, description = "Department ID")),
    responses(
        (status = 200, description = "Department details", body = DepartmentResponse),
        (status = 404, description = "Department not found", body = crate::api::openapi::ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_department(
    State(state): State<SharedState>,
    Path(department_id): Path<Uuid>,
) -> Result<Json<DepartmentResponse>> {
    let department: Department =
        sqlx::query_as(&format!("{} WHERE id = $1", SELECT_DEPARTMENT))
            .bind(department_id)
            .fetch_optional(&state.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Department not found".to_string()))?;

    Ok(Json(department.into()))
}

/// Create a department. Admin only.
#[utoipa::path(
    post,
    path = "/",
    context_path = "/api/v1/departments",
    tag = "departments",
    request_body = CreateDepartmentRequest,
    responses(
        (status = 201, description = "Department created", body = DepartmentResponse),
        (status = 409, description = "Duplicate name or code", body = crate::api::openapi::ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_department(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Json(payload): Json<CreateDepartmentRequest>,
) -> Result<(axum::http::StatusCode, Json<DepartmentResponse>)> {
    require_admin(&auth)?;
    if payload.name.trim().is_empty() || payload.code.trim().is_empty() {
        return Err(AppError::Validation("name and code are required".into()));
    }

    let department: Department = sqlx::query_as(
        r#"
        INSERT INTO departments (name, code)
        VALUES ($1, $2)
        RETURNING id, name, code, created_at, updated_at
        "#,
    )
    .bind(payload.name.trim())
    .bind(payload.code.trim().to_uppercase())
    .fetch_one(&state.db)
    .await
    .map_err(map_duplicate)?;

    tracing::info!(department = %department.id, code = %department.code, "Department created");

    Ok((axum::http::StatusCode::CREATED, Json(department.into())))
}

/// Update a department. Admin only.
#[utoipa::path(
    patch,
    path = "/{id}",
    context_path = "/api/v1/departments",
    tag = "departments",
    params(("id" = Uuid, Path, description = "Department ID")),
    request_body = UpdateDepartmentRequest,
    responses(
        (status = 200, description = "Department updated", body = DepartmentResponse),
        (status = 404, description = "Department not found", body = crate::api::openapi::ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_department(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path(department_id): Path<Uuid>,
    Json(payload): Json<UpdateDepartmentRequest>,
) -> Result<Json<DepartmentResponse>> {
    require_admin(&auth)?;
    let department: Department = sqlx::query_as(
        r#"
        UPDATE departments
        SET name = COALESCE($2, name),
            code = COALESCE($3, code),
            updated_at = NOW()
        WHERE id = $1
        RETURNING id, name, code, created_at, updated_at
        "#,
    )
    .bind(department_id)
    .bind(payload.name.as_deref().map(str::trim))
    .bind(payload.code.as_deref().map(|c| c.trim().to_uppercase()))
    .fetch_optional(&state.db)
    .await
    .map_err(map_duplicate)?
    .ok_or_else(|| AppError::NotFound("Department not found".to_string()))?;

    Ok(Json(department.into()))
}

/// Delete a department. Members keep their accounts; their department link
/// is nulled by the schema.
#[utoipa::path(
    delete,
    path = "/{id}",
    context_path = "/api/v1/departments",
    tag = "departments",
    params(("id" = Uuid, Path, description = "Department ID")),
    responses(
        (status = 204, description = "Department deleted"),
        (status = 404, description = "Department not found", body = crate::api::openapi::ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_department(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path(department_id): Path<Uuid>,
) -> Result<axum::http::StatusCode> {
    require_admin(&auth)?;
    let result = sqlx::query("DELETE FROM departments WHERE id = $1")
        .bind(department_id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Department not found".to_string()));
    }

    tracing::info!(department = %department_id, "Department deleted");

    Ok(axum::http::StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// OpenAPI
// ---------------------------------------------------------------------------

#[derive(OpenApi)]
#[openapi(
    paths(
        list_departments,
        get_department,
        create_department,
        update_department,
        delete_department,
    ),
    components(schemas(
        CreateDepartmentRequest,
        UpdateDepartmentRequest,
        DepartmentResponse,
    ))
)]
pub struct DepartmentsApiDoc;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
