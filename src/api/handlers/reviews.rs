//! Review handlers: the reviewer-facing side of the workflow.
//!
//! All decisions delegate to the workflow engine, which re-validates the
//! acting identity against the record; these handlers stay thin.

use axum::{
    extract::{Extension, Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use utoipa::{IntoParams, OpenApi, ToSchema};
use uuid::Uuid;

use crate::api::dto::{Pagination, PaginationQuery};
use crate::api::handlers::assignments::{AssignmentListResponse, AssignmentResponse, AssignmentSummary};
use crate::api::middleware::auth::AuthExtension;
use crate::api::SharedState;
use crate::error::{AppError, Result};
use crate::models::assignment::Assignment;
use crate::services::workflow_service::WorkflowService;

/// Create review routes
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/pending", get(list_pending))
        .route("/:id/approve", post(approve_assignment))
        .route("/:id/reject", post(reject_assignment))
        .route("/:id/forward", post(forward_assignment))
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, IntoParams)]
pub struct PendingQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl PendingQuery {
    fn pagination(&self) -> PaginationQuery {
        PaginationQuery {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct DecisionRequest {
    /// Required on reject, optional elsewhere
    pub remark: Option<String>,
    /// Optional opaque signature token recorded in the history entry
    pub signature: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ForwardRequest {
    pub new_reviewer_id: Uuid,
    pub remark: Option<String>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// List assignments awaiting the caller's decision.
#[utoipa::path(
    get,
    path = "/pending",
    context_path = "/api/v1/reviews",
    tag = "reviews",
    params(PendingQuery),
    responses(
        (status = 200, description = "Pending assignments", body = AssignmentListResponse),
        (status = 403, description = "Caller cannot review", body = crate::api::openapi::ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_pending(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Query(query): Query<PendingQuery>,
) -> Result<Json<AssignmentListResponse>> {
    if !auth.role.can_review() {
        return Err(AppError::Authorization(
            "only professors or HODs may review assignments".to_string(),
        ));
    }

    let rows: Vec<Assignment> = sqlx::query_as(
        r#"
        SELECT
            id, owner_id, title, description, category,
            file_path, file_original_name, file_size,
            status, reviewer_id, current_reviewer, department_id,
            created_at, updated_at
        FROM assignments
        WHERE current_reviewer = $1 AND status IN ('submitted', 'forwarded')
        ORDER BY updated_at ASC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(auth.user_id)
    .bind(query.pagination().per_page() as i64)
    .bind(query.pagination().offset())
    .fetch_all(&state.db)
    .await?;

    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM assignments WHERE current_reviewer = $1 AND status IN ('submitted', 'forwarded')",
    )
    .bind(auth.user_id)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(AssignmentListResponse {
        items: rows.into_iter().map(AssignmentSummary::from).collect(),
        pagination: Pagination::from_query_and_total(&query.pagination(), total),
    }))
}

/// Approve a pending assignment. Terminal.
#[utoipa::path(
    post,
    path = "/{id}/approve",
    context_path = "/api/v1/reviews",
    tag = "reviews",
    params(("id" = Uuid, Path, description = "Assignment ID")),
    request_body = DecisionRequest,
    responses(
        (status = 200, description = "Assignment approved", body = AssignmentResponse),
        (status = 403, description = "Not the current reviewer", body = crate::api::openapi::ErrorResponse),
        (status = 409, description = "Not pending a decision", body = crate::api::openapi::ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn approve_assignment(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path(assignment_id): Path<Uuid>,
    Json(payload): Json<DecisionRequest>,
) -> Result<Json<AssignmentResponse>> {
    let workflow = WorkflowService::new(state.db.clone());
    let detail = workflow
        .approve(assignment_id, &auth.actor(), payload.remark, payload.signature)
        .await?;

    Ok(Json(detail.into()))
}

/// Reject a pending assignment. A remark is required; the owner may
/// resubmit afterwards.
#[utoipa::path(
    post,
    path = "/{id}/reject",
    context_path = "/api/v1/reviews",
    tag = "reviews",
    params(("id" = Uuid, Path, description = "Assignment ID")),
    request_body = DecisionRequest,
    responses(
        (status = 200, description = "Assignment rejected", body = AssignmentResponse),
        (status = 400, description = "Missing remark", body = crate::api::openapi::ErrorResponse),
        (status = 403, description = "Not the current reviewer", body = crate::api::openapi::ErrorResponse),
        (status = 409, description = "Not pending a decision", body = crate::api::openapi::ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn reject_assignment(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path(assignment_id): Path<Uuid>,
    Json(payload): Json<DecisionRequest>,
) -> Result<Json<AssignmentResponse>> {
    let workflow = WorkflowService::new(state.db.clone());
    let detail = workflow
        .reject(assignment_id, &auth.actor(), payload.remark, payload.signature)
        .await?;

    Ok(Json(detail.into()))
}

/// Forward a pending assignment to another reviewer.
#[utoipa::path(
    post,
    path = "/{id}/forward",
    context_path = "/api/v1/reviews",
    tag = "reviews",
    params(("id" = Uuid, Path, description = "Assignment ID")),
    request_body = ForwardRequest,
    responses(
        (status = 200, description = "Assignment forwarded", body = AssignmentResponse),
        (status = 400, description = "Target cannot review", body = crate::api::openapi::ErrorResponse),
        (status = 403, description = "Not the current reviewer", body = crate::api::openapi::ErrorResponse),
        (status = 409, description = "Not pending a decision", body = crate::api::openapi::ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn forward_assignment(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path(assignment_id): Path<Uuid>,
    Json(payload): Json<ForwardRequest>,
) -> Result<Json<AssignmentResponse>> {
    let workflow = WorkflowService::new(state.db.clone());
    let detail = workflow
        .forward(
            assignment_id,
            &auth.actor(),
            payload.new_reviewer_id,
            payload.remark,
        )
        .await?;

    Ok(Json(detail.into()))
}

// ---------------------------------------------------------------------------
// OpenAPI
// ---------------------------------------------------------------------------

#[derive(OpenApi)]
#[openapi(
    paths(list_pending, approve_assignment, reject_assignment, forward_assignment),
    components(schemas(DecisionRequest, ForwardRequest))
)]
pub struct ReviewsApiDoc;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
