//! Assignment model and workflow enums.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Assignment workflow status.
///
/// `forwarded` behaves like `submitted` for decision purposes; the distinct
/// value is kept so hand-offs are visible on the record itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "assignment_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AssignmentStatus {
    Draft,
    Submitted,
    Approved,
    Rejected,
    Forwarded,
}

impl AssignmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AssignmentStatus::Draft => "draft",
            AssignmentStatus::Submitted => "submitted",
            AssignmentStatus::Approved => "approved",
            AssignmentStatus::Rejected => "rejected",
            AssignmentStatus::Forwarded => "forwarded",
        }
    }

    /// A pending-decision status admits reviewer actions.
    pub fn is_pending_decision(self) -> bool {
        matches!(self, AssignmentStatus::Submitted | AssignmentStatus::Forwarded)
    }
}

/// Assignment category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "assignment_category", rename_all = "lowercase")]
pub enum AssignmentCategory {
    Assignment,
    Thesis,
    Report,
}

/// Action recorded in the workflow history log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "history_action", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum HistoryAction {
    Submitted,
    Approved,
    Rejected,
    Resubmitted,
    Forwarded,
}

impl HistoryAction {
    pub fn as_str(self) -> &'static str {
        match self {
            HistoryAction::Submitted => "submitted",
            HistoryAction::Approved => "approved",
            HistoryAction::Rejected => "rejected",
            HistoryAction::Resubmitted => "resubmitted",
            HistoryAction::Forwarded => "forwarded",
        }
    }

    /// The status an assignment is in immediately after this action.
    pub fn resulting_status(self) -> AssignmentStatus {
        match self {
            HistoryAction::Submitted | HistoryAction::Resubmitted => AssignmentStatus::Submitted,
            HistoryAction::Approved => AssignmentStatus::Approved,
            HistoryAction::Rejected => AssignmentStatus::Rejected,
            HistoryAction::Forwarded => AssignmentStatus::Forwarded,
        }
    }
}

/// Assignment entity
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Assignment {
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

/// One immutable record of a workflow event
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct HistoryEntry {
    pub id: Uuid,
    pub assignment_id: Uuid,
    pub seq: i32,
    /// NULL for owner-authored entries (submitted / resubmitted)
    pub reviewer_id: Option<Uuid>,
    pub action: HistoryAction,
    pub remark: Option<String>,
    pub signature: Option<String>,
    /// Set only on `resubmitted`, preserving the replaced file reference
    pub old_file_path: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Assignment record with its ordered history log
#[derive(Debug, Clone, Serialize)]
pub struct AssignmentDetail {
    #[serde(flatten)]
    pub assignment: Assignment,
    pub history: Vec<HistoryEntry>,
}

/// File reference supplied to submit/resubmit after the blob has been stored
#[derive(Debug, Clone)]
pub struct FileRef {
    pub path: String,
    pub original_name: String,
    pub size: i64,
}
