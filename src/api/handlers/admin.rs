//! Admin dashboard handlers.

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use utoipa::{OpenApi, ToSchema};

use crate::api::SharedState;
use crate::error::Result;
use crate::models::user::Role;

/// Create admin routes
pub fn router() -> Router<SharedState> {
    Router::new().route("/overview", get(overview))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OverviewResponse {
    pub total_departments: i64,
    pub total_users: i64,
    pub total_students: i64,
    pub total_professors: i64,
    pub total_hods: i64,
    pub total_assignments: i64,
    pub pending_reviews: i64,
}

/// Portal-wide counts for the admin dashboard.
#[utoipa::path(
    get,
    path = "/overview",
    context_path = "/api/v1/admin",
    tag = "admin",
    responses(
        (status = 200, description = "Portal counts", body = OverviewResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn overview(State(state): State<SharedState>) -> Result<Json<OverviewResponse>> {
    let total_departments: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM departments")
        .fetch_one(&state.db)
        .await?;
    let total_users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(&state.db)
        .await?;

    let count_role = |role: Role| {
        let db = state.db.clone();
        async move {
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE role = $1")
                .bind(role)
                .fetch_one(&db)
                .await
        }
    };

    let total_students = count_role(Role::Student).await?;
    let total_professors = count_role(Role::Professor).await?;
    let total_hods = count_role(Role::Hod).await?;

    let total_assignments: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM assignments")
        .fetch_one(&state.db)
        .await?;
    let pending_reviews: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM assignments WHERE status IN ('submitted', 'forwarded')",
    )
    .fetch_one(&state.db)
    .await?;

    Ok(Json(OverviewResponse {
        total_departments,
        total_users,
        total_students,
        total_professors,
        total_hods,
        total_assignments,
        pending_reviews,
    }))
}

// ---------------------------------------------------------------------------
// OpenAPI
// ---------------------------------------------------------------------------

#[derive(OpenApi)]
#[openapi(paths(overview), components(schemas(OverviewResponse)))]
pub struct AdminApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overview_response_serialize() {
        let resp = OverviewResponse {
            total_departments: 3,
            total_users: 42,
            total_students: 30,
            total_professors: 8,
            total_hods: 3,
            total_assignments: 120,
            pending_reviews: 7,
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["total_users"], 42);
        assert_eq!(json["pending_reviews"], 7);
    }
}
