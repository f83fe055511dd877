//! Assignment handlers: draft CRUD, submission, resubmission, and history.
//!
//! Drafts are owned by students. Submitting uploads the document to blob
//! storage and hands the record to the workflow engine; from then on every
//! status change goes through the engine and lands in the history log.

use axum::{
    extract::{Extension, Multipart, Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, OpenApi, ToSchema};
use uuid::Uuid;

use crate::api::dto::{Pagination, PaginationQuery};
use crate::api::middleware::auth::AuthExtension;
use crate::api::SharedState;
use crate::error::{AppError, Result};
use crate::models::assignment::{
    Assignment, AssignmentCategory, AssignmentDetail, AssignmentStatus, FileRef, HistoryAction,
    HistoryEntry,
};
use crate::models::user::Actor;
use crate::services::workflow_service::WorkflowService;
use crate::storage::filesystem::FilesystemStorage;
use crate::storage::{content_key, StorageBackend};

/// Create assignment routes
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", get(list_assignments).post(create_assignment))
        .route(
            "/:id",
            get(get_assignment)
                .patch(update_assignment)
                .delete(delete_assignment),
        )
        .route("/:id/submit", post(submit_assignment))
        .route("/:id/resubmit", post(resubmit_assignment))
        .route("/:id/history", get(get_history))
}

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateAssignmentRequest {
    pub title: String,
    pub description: Option<String>,
    pub category: AssignmentCategory,
    pub department_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateAssignmentRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<AssignmentCategory>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListAssignmentsQuery {
    pub status: Option<AssignmentStatus>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl ListAssignmentsQuery {
    fn pagination(&self) -> PaginationQuery {
        PaginationQuery {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AssignmentSummary {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub category: AssignmentCategory,
    pub file_path: Option<String>,
    pub file_original_name: Option<String>,
    pub file_size: Option<i64>,
    pub status: AssignmentStatus,
    pub reviewer_id: Option<Uuid>,
    pub current_reviewer: Option<Uuid>,
    pub department_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Assignment> for AssignmentSummary {
    fn from(a: Assignment) -> Self {
        Self {
            id: a.id,
            owner_id: a.owner_id,
            title: a.title,
            description: a.description,
            category: a.category,
            file_path: a.file_path,
            file_original_name: a.file_original_name,
            file_size: a.file_size,
            status: a.status,
            reviewer_id: a.reviewer_id,
            current_reviewer: a.current_reviewer,
            department_id: a.department_id,
            created_at: a.created_at,
            updated_at: a.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HistoryEntryResponse {
    pub seq: i32,
    pub reviewer_id: Option<Uuid>,
    pub action: HistoryAction,
    pub remark: Option<String>,
    pub signature: Option<String>,
    pub old_file_path: Option<String>,
    pub date: DateTime<Utc>,
}

impl From<HistoryEntry> for HistoryEntryResponse {
    fn from(e: HistoryEntry) -> Self {
        Self {
            seq: e.seq,
            reviewer_id: e.reviewer_id,
            action: e.action,
            remark: e.remark,
            signature: e.signature,
            old_file_path: e.old_file_path,
            date: e.created_at,
        }
    }
}

/// Full assignment record including the workflow history log
#[derive(Debug, Serialize, ToSchema)]
pub struct AssignmentResponse {
    #[serde(flatten)]
    pub assignment: AssignmentSummary,
    pub history: Vec<HistoryEntryResponse>,
}

impl From<AssignmentDetail> for AssignmentResponse {
    fn from(detail: AssignmentDetail) -> Self {
        Self {
            assignment: detail.assignment.into(),
            history: detail
                .history
                .into_iter()
                .map(HistoryEntryResponse::from)
                .collect(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AssignmentListResponse {
    pub items: Vec<AssignmentSummary>,
    pub pagination: Pagination,
}

const SELECT_ASSIGNMENT: &str = r#"
    SELECT
        id, owner_id, title, description, category,
        file_path, file_original_name, file_size,
        status, reviewer_id, current_reviewer, department_id,
        created_at, updated_at
    FROM assignments
"#;

// ---------------------------------------------------------------------------
// Guards
// ---------------------------------------------------------------------------

/// Owner, any reviewer on the record, or an admin may view an assignment.
fn view_guard(actor: &Actor, assignment: &Assignment, appears_in_history: bool) -> Result<()> {
    let allowed = actor.role.is_admin()
        || assignment.owner_id == actor.id
        || assignment.reviewer_id == Some(actor.id)
        || assignment.current_reviewer == Some(actor.id)
        || appears_in_history;

    if allowed {
        Ok(())
    } else {
        Err(AppError::Authorization(
            "you do not have access to this assignment".to_string(),
        ))
    }
}

/// Admins delete anything; owners only their own drafts. Deletion is
/// administrative, not a workflow transition.
fn delete_guard(actor: &Actor, assignment: &Assignment) -> Result<()> {
    if actor.role.is_admin() {
        return Ok(());
    }
    if assignment.owner_id != actor.id {
        return Err(AppError::Authorization(
            "only the owner or an admin may delete an assignment".to_string(),
        ));
    }
    if assignment.status != AssignmentStatus::Draft {
        return Err(AppError::InvalidTransition(
            "only draft assignments can be deleted by their owner".to_string(),
        ));
    }
    Ok(())
}

/// Draft metadata is mutable only before first submission.
fn draft_edit_guard(actor: &Actor, assignment: &Assignment) -> Result<()> {
    if assignment.owner_id != actor.id {
        return Err(AppError::Authorization(
            "only the owner may edit an assignment".to_string(),
        ));
    }
    if assignment.status != AssignmentStatus::Draft {
        return Err(AppError::InvalidTransition(
            "title, description, and category are immutable after submission".to_string(),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn load_assignment(db: &sqlx::PgPool, assignment_id: Uuid) -> Result<Assignment> {
    let assignment: Assignment =
        sqlx::query_as(&format!("{} WHERE id = $1", SELECT_ASSIGNMENT))
            .bind(assignment_id)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::NotFound("Assignment not found".to_string()))?;

    Ok(assignment)
}

async fn appears_in_history(
    db: &sqlx::PgPool,
    assignment_id: Uuid,
    user_id: Uuid,
) -> Result<bool> {
    let found: Option<i32> = sqlx::query_scalar(
        "SELECT 1 FROM assignment_history WHERE assignment_id = $1 AND reviewer_id = $2 LIMIT 1",
    )
    .bind(assignment_id)
    .bind(user_id)
    .fetch_optional(db)
    .await?;

    Ok(found.is_some())
}

/// Parsed multipart upload form: the document plus optional text fields.
struct UploadForm {
    file: Option<(String, Bytes)>,
    reviewer_id: Option<Uuid>,
}

async fn parse_upload_form(mut multipart: Multipart) -> Result<UploadForm> {
    let mut form = UploadForm {
        file: None,
        reviewer_id: None,
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("invalid multipart request: {}", e)))?
    {
        match field.name().unwrap_or("") {
            "file" => {
                let name = field.file_name().unwrap_or("upload.bin").to_string();
                let content = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("invalid file field: {}", e)))?;
                form.file = Some((name, content));
            }
            "reviewer_id" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("invalid form field: {}", e)))?;
                form.reviewer_id = Some(text.trim().parse().map_err(|_| {
                    AppError::Validation("reviewer_id must be a UUID".to_string())
                })?);
            }
            _ => {}
        }
    }

    Ok(form)
}

/// Write the upload to blob storage, content-addressed, and return the file
/// reference the workflow engine records.
async fn store_upload(
    state: &SharedState,
    original_name: String,
    content: Bytes,
) -> Result<FileRef> {
    if content.is_empty() {
        return Err(AppError::Validation("uploaded file is empty".to_string()));
    }

    let key = content_key(&content);
    let size = content.len() as i64;
    let storage = FilesystemStorage::new(&state.config.upload_path);
    let path = storage.put(&key, content).await?;

    Ok(FileRef {
        path,
        original_name,
        size,
    })
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Create a draft assignment.
#[utoipa::path(
    post,
    path = "/",
    context_path = "/api/v1/assignments",
    tag = "assignments",
    request_body = CreateAssignmentRequest,
    responses(
        (status = 201, description = "Draft created", body = AssignmentSummary),
        (status = 403, description = "Caller cannot submit assignments", body = crate::api::openapi::ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_assignment(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Json(payload): Json<CreateAssignmentRequest>,
) -> Result<(axum::http::StatusCode, Json<AssignmentSummary>)> {
    if !auth.role.can_submit() {
        return Err(AppError::Authorization(
            "only students may create assignments".to_string(),
        ));
    }
    if payload.title.trim().is_empty() {
        return Err(AppError::Validation("a title is required".to_string()));
    }

    let assignment: Assignment = sqlx::query_as(
        r#"
        INSERT INTO assignments (owner_id, title, description, category, department_id)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, owner_id, title, description, category,
                  file_path, file_original_name, file_size,
                  status, reviewer_id, current_reviewer, department_id,
                  created_at, updated_at
        "#,
    )
    .bind(auth.user_id)
    .bind(payload.title.trim())
    .bind(&payload.description)
    .bind(payload.category)
    .bind(payload.department_id)
    .fetch_one(&state.db)
    .await?;

    tracing::info!(assignment = %assignment.id, owner = %auth.user_id, "Draft created");

    Ok((axum::http::StatusCode::CREATED, Json(assignment.into())))
}

/// List assignments visible to the caller: students see their own,
/// reviewers the ones assigned to them, admins everything.
#[utoipa::path(
    get,
    path = "/",
    context_path = "/api/v1/assignments",
    tag = "assignments",
    params(ListAssignmentsQuery),
    responses(
        (status = 200, description = "Assignment list", body = AssignmentListResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_assignments(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Query(query): Query<ListAssignmentsQuery>,
) -> Result<Json<AssignmentListResponse>> {
    // Visibility clause by role, then optional status filter
    let mut conditions: Vec<String> = vec![];
    let mut bind_idx = 1u32;

    let scope_by_user = if auth.role.is_admin() {
        false
    } else if auth.role.can_review() {
        conditions.push(format!(
            "(current_reviewer = ${} OR reviewer_id = ${})",
            bind_idx, bind_idx
        ));
        bind_idx += 1;
        true
    } else {
        conditions.push(format!("owner_id = ${}", bind_idx));
        bind_idx += 1;
        true
    };

    if query.status.is_some() {
        conditions.push(format!("status = ${}", bind_idx));
        bind_idx += 1;
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    };

    let list_sql = format!(
        "{}{} ORDER BY updated_at DESC LIMIT ${} OFFSET ${}",
        SELECT_ASSIGNMENT,
        where_clause,
        bind_idx,
        bind_idx + 1
    );
    let count_sql = format!("SELECT COUNT(*) FROM assignments{}", where_clause);

    let mut list_query = sqlx::query_as::<_, Assignment>(&list_sql);
    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);

    if scope_by_user {
        list_query = list_query.bind(auth.user_id);
        count_query = count_query.bind(auth.user_id);
    }
    if let Some(status) = query.status {
        list_query = list_query.bind(status);
        count_query = count_query.bind(status);
    }

    let pagination = query.pagination();
    let rows = list_query
        .bind(pagination.per_page() as i64)
        .bind(pagination.offset())
        .fetch_all(&state.db)
        .await?;

    let total = count_query.fetch_one(&state.db).await?;

    Ok(Json(AssignmentListResponse {
        items: rows.into_iter().map(AssignmentSummary::from).collect(),
        pagination: Pagination::from_query_and_total(&pagination, total),
    }))
}

/// Get one assignment with its history.
#[utoipa::path(
    get,
    path = "/{id}",
    context_path = "/api/v1/assignments",
    tag = "assignments",
    params(("id" = Uuid, Path, description = "Assignment ID")),
    responses(
        (status = 200, description = "Assignment details", body = AssignmentResponse),
        (status = 403, description = "No access", body = crate::api::openapi::ErrorResponse),
        (status = 404, description = "Assignment not found", body = crate::api::openapi::ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_assignment(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path(assignment_id): Path<Uuid>,
) -> Result<Json<AssignmentResponse>> {
    let assignment = load_assignment(&state.db, assignment_id).await?;
    let in_history = appears_in_history(&state.db, assignment_id, auth.user_id).await?;
    view_guard(&auth.actor(), &assignment, in_history)?;

    let workflow = WorkflowService::new(state.db.clone());
    let detail = workflow.detail(assignment_id).await?;

    Ok(Json(detail.into()))
}

/// Update draft metadata. Immutable after first submission.
#[utoipa::path(
    patch,
    path = "/{id}",
    context_path = "/api/v1/assignments",
    tag = "assignments",
    params(("id" = Uuid, Path, description = "Assignment ID")),
    request_body = UpdateAssignmentRequest,
    responses(
        (status = 200, description = "Draft updated", body = AssignmentSummary),
        (status = 409, description = "No longer a draft", body = crate::api::openapi::ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_assignment(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path(assignment_id): Path<Uuid>,
    Json(payload): Json<UpdateAssignmentRequest>,
) -> Result<Json<AssignmentSummary>> {
    let assignment = load_assignment(&state.db, assignment_id).await?;
    draft_edit_guard(&auth.actor(), &assignment)?;

    // Conditioned on status so a concurrent submit cannot interleave
    let updated: Assignment = sqlx::query_as(
        r#"
        UPDATE assignments
        SET title = COALESCE($3, title),
            description = COALESCE($4, description),
            category = COALESCE($5, category),
            updated_at = NOW()
        WHERE id = $1 AND status = $2
        RETURNING id, owner_id, title, description, category,
                  file_path, file_original_name, file_size,
                  status, reviewer_id, current_reviewer, department_id,
                  created_at, updated_at
        "#,
    )
    .bind(assignment_id)
    .bind(AssignmentStatus::Draft)
    .bind(payload.title.as_deref().map(str::trim))
    .bind(&payload.description)
    .bind(payload.category)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| {
        AppError::InvalidTransition(
            "title, description, and category are immutable after submission".to_string(),
        )
    })?;

    Ok(Json(updated.into()))
}

/// Delete an assignment (administrative, not a workflow transition).
#[utoipa::path(
    delete,
    path = "/{id}",
    context_path = "/api/v1/assignments",
    tag = "assignments",
    params(("id" = Uuid, Path, description = "Assignment ID")),
    responses(
        (status = 204, description = "Assignment deleted"),
        (status = 403, description = "Not allowed", body = crate::api::openapi::ErrorResponse),
        (status = 404, description = "Assignment not found", body = crate::api::openapi::ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_assignment(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path(assignment_id): Path<Uuid>,
) -> Result<axum::http::StatusCode> {
    let assignment = load_assignment(&state.db, assignment_id).await?;
    delete_guard(&auth.actor(), &assignment)?;

    // History rows cascade; uploaded blobs are retained on purpose.
    sqlx::query("DELETE FROM assignments WHERE id = $1")
        .bind(assignment_id)
        .execute(&state.db)
        .await?;

    tracing::info!(assignment = %assignment_id, deleted_by = %auth.user_id, "Assignment deleted");

    Ok(axum::http::StatusCode::NO_CONTENT)
}

/// Submit a draft: multipart form with `file` and `reviewer_id`.
#[utoipa::path(
    post,
    path = "/{id}/submit",
    context_path = "/api/v1/assignments",
    tag = "assignments",
    params(("id" = Uuid, Path, description = "Assignment ID")),
    responses(
        (status = 200, description = "Assignment submitted", body = AssignmentResponse),
        (status = 400, description = "Missing file or reviewer", body = crate::api::openapi::ErrorResponse),
        (status = 403, description = "Not the owner", body = crate::api::openapi::ErrorResponse),
        (status = 409, description = "Not submittable from current status", body = crate::api::openapi::ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn submit_assignment(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path(assignment_id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Json<AssignmentResponse>> {
    let form = parse_upload_form(multipart).await?;

    let (original_name, content) = form
        .file
        .ok_or_else(|| AppError::Validation("missing 'file' field".to_string()))?;
    let reviewer_id = form
        .reviewer_id
        .ok_or_else(|| AppError::Validation("missing 'reviewer_id' field".to_string()))?;

    let file = store_upload(&state, original_name, content).await?;

    let workflow = WorkflowService::new(state.db.clone());
    let detail = workflow
        .submit(assignment_id, &auth.actor(), file, reviewer_id)
        .await?;

    Ok(Json(detail.into()))
}

/// Resubmit a rejected assignment: multipart form with `file`.
#[utoipa::path(
    post,
    path = "/{id}/resubmit",
    context_path = "/api/v1/assignments",
    tag = "assignments",
    params(("id" = Uuid, Path, description = "Assignment ID")),
    responses(
        (status = 200, description = "Assignment resubmitted", body = AssignmentResponse),
        (status = 400, description = "Missing file", body = crate::api::openapi::ErrorResponse),
        (status = 409, description = "Not resubmittable from current status", body = crate::api::openapi::ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn resubmit_assignment(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path(assignment_id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Json<AssignmentResponse>> {
    let form = parse_upload_form(multipart).await?;

    let (original_name, content) = form
        .file
        .ok_or_else(|| AppError::Validation("missing 'file' field".to_string()))?;

    let file = store_upload(&state, original_name, content).await?;

    let workflow = WorkflowService::new(state.db.clone());
    let detail = workflow
        .resubmit(assignment_id, &auth.actor(), file)
        .await?;

    Ok(Json(detail.into()))
}

/// Get the ordered workflow history of an assignment.
#[utoipa::path(
    get,
    path = "/{id}/history",
    context_path = "/api/v1/assignments",
    tag = "assignments",
    params(("id" = Uuid, Path, description = "Assignment ID")),
    responses(
        (status = 200, description = "History log", body = [HistoryEntryResponse]),
        (status = 404, description = "Assignment not found", body = crate::api::openapi::ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_history(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path(assignment_id): Path<Uuid>,
) -> Result<Json<Vec<HistoryEntryResponse>>> {
    let assignment = load_assignment(&state.db, assignment_id).await?;
    let in_history = appears_in_history(&state.db, assignment_id, auth.user_id).await?;
    view_guard(&auth.actor(), &assignment, in_history)?;

    let workflow = WorkflowService::new(state.db.clone());
    let entries = workflow.history(assignment_id).await?;

    Ok(Json(
        entries.into_iter().map(HistoryEntryResponse::from).collect(),
    ))
}

// ---------------------------------------------------------------------------
// OpenAPI
// ---------------------------------------------------------------------------

#[derive(OpenApi)]
#[openapi(
    paths(
        create_assignment,
        list_assignments,
        get_assignment,
        update_assignment,
        delete_assignment,
        submit_assignment,
        resubmit_assignment,
        get_history,
    ),
    components(schemas(
        CreateAssignmentRequest,
        UpdateAssignmentRequest,
        AssignmentSummary,
        AssignmentResponse,
        AssignmentListResponse,
        HistoryEntryResponse,
    ))
)]
pub struct AssignmentsApiDoc;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::Role;

    fn assignment(status: AssignmentStatus, owner: Uuid) -> Assignment {
        Assignment {
            id: Uuid::new_v4(),
            owner_id: owner,
            title: "Networks report".to_string(),
            description: None,
            category: AssignmentCategory::Report,
            file_path: None,
            file_original_name: None,
            file_size: None,
            status,
            reviewer_id: None,
            current_reviewer: None,
            department_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn actor(role: Role) -> Actor {
        Actor {
            id: Uuid::new_v4(),
            role,
        }
    }

    // -----------------------------------------------------------------------
    // view_guard
    // -----------------------------------------------------------------------

    #[test]
    fn test_view_guard_owner() {
        let owner = actor(Role::Student);
        let a = assignment(AssignmentStatus::Draft, owner.id);
        assert!(view_guard(&owner, &a, false).is_ok());
    }

    #[test]
    fn test_view_guard_admin() {
        let a = assignment(AssignmentStatus::Submitted, Uuid::new_v4());
        assert!(view_guard(&actor(Role::Admin), &a, false).is_ok());
    }

    #[test]
    fn test_view_guard_current_reviewer() {
        let reviewer = actor(Role::Professor);
        let mut a = assignment(AssignmentStatus::Submitted, Uuid::new_v4());
        a.current_reviewer = Some(reviewer.id);
        assert!(view_guard(&reviewer, &a, false).is_ok());
    }

    #[test]
    fn test_view_guard_past_reviewer_via_history() {
        let reviewer = actor(Role::Professor);
        let a = assignment(AssignmentStatus::Approved, Uuid::new_v4());
        assert!(view_guard(&reviewer, &a, true).is_ok());
    }

    #[test]
    fn test_view_guard_stranger_denied() {
        let a = assignment(AssignmentStatus::Submitted, Uuid::new_v4());
        let err = view_guard(&actor(Role::Student), &a, false).unwrap_err();
        assert!(matches!(err, AppError::Authorization(_)));
    }

    // -----------------------------------------------------------------------
    // delete_guard
    // -----------------------------------------------------------------------

    #[test]
    fn test_delete_guard_admin_any_status() {
        let a = assignment(AssignmentStatus::Approved, Uuid::new_v4());
        assert!(delete_guard(&actor(Role::Admin), &a).is_ok());
    }

    #[test]
    fn test_delete_guard_owner_draft_only() {
        let owner = actor(Role::Student);
        let draft = assignment(AssignmentStatus::Draft, owner.id);
        assert!(delete_guard(&owner, &draft).is_ok());

        let submitted = assignment(AssignmentStatus::Submitted, owner.id);
        let err = delete_guard(&owner, &submitted).unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition(_)));
    }

    #[test]
    fn test_delete_guard_stranger_denied() {
        let a = assignment(AssignmentStatus::Draft, Uuid::new_v4());
        let err = delete_guard(&actor(Role::Student), &a).unwrap_err();
        assert!(matches!(err, AppError::Authorization(_)));
    }

    // -----------------------------------------------------------------------
    // draft_edit_guard
    // -----------------------------------------------------------------------

    #[test]
    fn test_draft_edit_guard_owner_draft() {
        let owner = actor(Role::Student);
        let a = assignment(AssignmentStatus::Draft, owner.id);
        assert!(draft_edit_guard(&owner, &a).is_ok());
    }

    #[test]
    fn test_draft_edit_guard_after_submission() {
        let owner = actor(Role::Student);
        let a = assignment(AssignmentStatus::Rejected, owner.id);
        let err = draft_edit_guard(&owner, &a).unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition(_)));
    }

    #[test]
    fn test_draft_edit_guard_non_owner() {
        let a = assignment(AssignmentStatus::Draft, Uuid::new_v4());
        let err = draft_edit_guard(&actor(Role::Student), &a).unwrap_err();
        assert!(matches!(err, AppError::Authorization(_)));
    }

    // -----------------------------------------------------------------------
    // DTOs
    // -----------------------------------------------------------------------

    #[test]
    fn test_create_assignment_request_deserialize() {
        let json = serde_json::json!({
            "title": "Compiler design thesis",
            "category": "Thesis"
        });
        let req: CreateAssignmentRequest = serde_json::from_value(json).unwrap();
        assert_eq!(req.category, AssignmentCategory::Thesis);
        assert!(req.description.is_none());
    }

    #[test]
    fn test_assignment_response_flattens_record() {
        let detail = AssignmentDetail {
            assignment: assignment(AssignmentStatus::Submitted, Uuid::nil()),
            history: vec![HistoryEntry {
                id: Uuid::nil(),
                assignment_id: Uuid::nil(),
                seq: 1,
                reviewer_id: None,
                action: HistoryAction::Submitted,
                remark: None,
                signature: None,
                old_file_path: None,
                created_at: Utc::now(),
            }],
        };
        let resp: AssignmentResponse = detail.into();
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["status"], "submitted");
        assert_eq!(json["history"][0]["action"], "submitted");
        assert_eq!(json["history"][0]["seq"], 1);
    }

    #[test]
    fn test_history_entry_response_renames_date() {
        let entry = HistoryEntry {
            id: Uuid::nil(),
            assignment_id: Uuid::nil(),
            seq: 2,
            reviewer_id: Some(Uuid::nil()),
            action: HistoryAction::Rejected,
            remark: Some("incomplete".into()),
            signature: None,
            old_file_path: None,
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(HistoryEntryResponse::from(entry)).unwrap();
        assert!(json.get("date").is_some());
        assert!(json.get("created_at").is_none());
    }

    #[test]
    fn test_list_assignments_query_deserialize() {
        let query: ListAssignmentsQuery =
            serde_json::from_value(serde_json::json!({"status": "rejected"})).unwrap();
        assert_eq!(query.status, Some(AssignmentStatus::Rejected));
    }
}
