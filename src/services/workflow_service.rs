//! Assignment workflow engine.
//!
//! Owns the assignment `status` field and its append-only history log.
//! Every transition validates the acting identity and role against the
//! current record, computes the next status through a single pure transition
//! function over enum types, and persists with a compare-and-swap UPDATE
//! conditioned on the status read at decision time. Of two concurrent
//! transitions from the same state, exactly one wins; the loser's UPDATE
//! matches zero rows and surfaces as an invalid transition, never a
//! clobbered history entry.

use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::assignment::{
    Assignment, AssignmentDetail, AssignmentStatus, FileRef, HistoryAction, HistoryEntry,
};
use crate::models::user::{Actor, Role};

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

/// A workflow operation requested by an actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowOp {
    Submit,
    Approve,
    Reject,
    Forward,
    Resubmit,
}

impl WorkflowOp {
    pub fn as_str(self) -> &'static str {
        match self {
            WorkflowOp::Submit => "submit",
            WorkflowOp::Approve => "approve",
            WorkflowOp::Reject => "reject",
            WorkflowOp::Forward => "forward",
            WorkflowOp::Resubmit => "resubmit",
        }
    }

    /// History action appended when this operation succeeds.
    pub fn history_action(self) -> HistoryAction {
        match self {
            WorkflowOp::Submit => HistoryAction::Submitted,
            WorkflowOp::Approve => HistoryAction::Approved,
            WorkflowOp::Reject => HistoryAction::Rejected,
            WorkflowOp::Forward => HistoryAction::Forwarded,
            WorkflowOp::Resubmit => HistoryAction::Resubmitted,
        }
    }
}

/// Compute the status an operation leads to from the current one.
///
/// The match enumerates every (status, operation) pair; illegal pairs
/// return `InvalidTransition`. Repeating a decision on a settled assignment
/// is an error, never a silent no-op.
pub fn next_status(current: AssignmentStatus, op: WorkflowOp) -> Result<AssignmentStatus> {
    use AssignmentStatus::*;
    use WorkflowOp::*;

    match (current, op) {
        (Draft, Submit) => Ok(Submitted),
        (Submitted | Forwarded, Approve) => Ok(Approved),
        (Submitted | Forwarded, Reject) => Ok(Rejected),
        (Submitted | Forwarded, Forward) => Ok(Forwarded),
        (Rejected, Resubmit) => Ok(Submitted),
        (Draft, Approve | Reject | Forward | Resubmit)
        | (Submitted | Forwarded, Submit | Resubmit)
        | (Rejected, Submit | Approve | Reject | Forward)
        | (Approved, _) => Err(AppError::InvalidTransition(format!(
            "cannot {} an assignment in status '{}'",
            op.as_str(),
            current.as_str()
        ))),
    }
}

// ---------------------------------------------------------------------------
// Guards
// ---------------------------------------------------------------------------

fn require_owner(assignment: &Assignment, actor: &Actor) -> Result<()> {
    if !actor.role.can_submit() {
        return Err(AppError::Authorization(
            "only students may submit assignments".to_string(),
        ));
    }
    if assignment.owner_id != actor.id {
        return Err(AppError::Authorization(
            "only the assignment owner may perform this action".to_string(),
        ));
    }
    Ok(())
}

fn require_current_reviewer(assignment: &Assignment, actor: &Actor) -> Result<()> {
    if !actor.role.can_review() {
        return Err(AppError::Authorization(
            "only professors or HODs may review assignments".to_string(),
        ));
    }
    if assignment.current_reviewer != Some(actor.id) {
        return Err(AppError::Authorization(
            "only the current reviewer may decide on this assignment".to_string(),
        ));
    }
    Ok(())
}

fn require_remark(remark: Option<String>) -> Result<String> {
    match remark.map(|r| r.trim().to_string()) {
        Some(r) if !r.is_empty() => Ok(r),
        _ => Err(AppError::Validation(
            "a remark is required when rejecting an assignment".to_string(),
        )),
    }
}

fn validate_file(file: &FileRef) -> Result<()> {
    if file.path.is_empty() || file.original_name.is_empty() {
        return Err(AppError::Validation(
            "a file is required for this operation".to_string(),
        ));
    }
    Ok(())
}

fn lost_race(id: Uuid, op: WorkflowOp) -> AppError {
    AppError::InvalidTransition(format!(
        "assignment {} changed status concurrently; {} is no longer valid",
        id,
        op.as_str()
    ))
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Workflow engine over the assignments table.
pub struct WorkflowService {
    db: PgPool,
}

const SELECT_ASSIGNMENT: &str = r#"
    SELECT
        id, owner_id, title, description, category,
        file_path, file_original_name, file_size,
        status, reviewer_id, current_reviewer, department_id,
        created_at, updated_at
    FROM assignments
"#;

const SELECT_HISTORY: &str = r#"
    SELECT
        id, assignment_id, seq, reviewer_id, action,
        remark, signature, old_file_path, created_at
    FROM assignment_history
"#;

impl WorkflowService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Submit a draft: attach the stored file, assign the reviewer, and move
    /// to `submitted` with the initial owner-authored history entry.
    pub async fn submit(
        &self,
        assignment_id: Uuid,
        actor: &Actor,
        file: FileRef,
        reviewer_id: Uuid,
    ) -> Result<AssignmentDetail> {
        let current = self.load(assignment_id).await?;
        require_owner(&current, actor)?;
        let next = next_status(current.status, WorkflowOp::Submit)?;
        validate_file(&file)?;
        self.require_reviewer_capable(reviewer_id).await?;

        let mut tx = self.db.begin().await?;
        let updated = sqlx::query(
            r#"
            UPDATE assignments
            SET status = $3, reviewer_id = $4, current_reviewer = $4,
                file_path = $5, file_original_name = $6, file_size = $7,
                updated_at = NOW()
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(assignment_id)
        .bind(current.status)
        .bind(next)
        .bind(reviewer_id)
        .bind(&file.path)
        .bind(&file.original_name)
        .bind(file.size)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(lost_race(assignment_id, WorkflowOp::Submit));
        }

        append_history(
            &mut tx,
            assignment_id,
            NewHistoryEntry {
                reviewer_id: None,
                action: HistoryAction::Submitted,
                remark: None,
                signature: None,
                old_file_path: None,
            },
        )
        .await?;
        tx.commit().await?;

        tracing::info!(
            assignment = %assignment_id,
            owner = %actor.id,
            reviewer = %reviewer_id,
            "Assignment submitted"
        );

        self.detail(assignment_id).await
    }

    /// Approve a pending assignment. Terminal.
    pub async fn approve(
        &self,
        assignment_id: Uuid,
        actor: &Actor,
        remark: Option<String>,
        signature: Option<String>,
    ) -> Result<AssignmentDetail> {
        let current = self.load(assignment_id).await?;
        let next = next_status(current.status, WorkflowOp::Approve)?;
        require_current_reviewer(&current, actor)?;

        let mut tx = self.db.begin().await?;
        let updated = sqlx::query(
            "UPDATE assignments SET status = $3, updated_at = NOW() WHERE id = $1 AND status = $2",
        )
        .bind(assignment_id)
        .bind(current.status)
        .bind(next)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(lost_race(assignment_id, WorkflowOp::Approve));
        }

        append_history(
            &mut tx,
            assignment_id,
            NewHistoryEntry {
                reviewer_id: Some(actor.id),
                action: HistoryAction::Approved,
                remark,
                signature,
                old_file_path: None,
            },
        )
        .await?;
        tx.commit().await?;

        tracing::info!(assignment = %assignment_id, reviewer = %actor.id, "Assignment approved");

        self.detail(assignment_id).await
    }

    /// Reject a pending assignment. A non-empty remark is required; the
    /// owner may later resubmit with a new file.
    pub async fn reject(
        &self,
        assignment_id: Uuid,
        actor: &Actor,
        remark: Option<String>,
        signature: Option<String>,
    ) -> Result<AssignmentDetail> {
        let current = self.load(assignment_id).await?;
        let next = next_status(current.status, WorkflowOp::Reject)?;
        require_current_reviewer(&current, actor)?;
        let remark = require_remark(remark)?;

        let mut tx = self.db.begin().await?;
        let updated = sqlx::query(
            "UPDATE assignments SET status = $3, updated_at = NOW() WHERE id = $1 AND status = $2",
        )
        .bind(assignment_id)
        .bind(current.status)
        .bind(next)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(lost_race(assignment_id, WorkflowOp::Reject));
        }

        append_history(
            &mut tx,
            assignment_id,
            NewHistoryEntry {
                reviewer_id: Some(actor.id),
                action: HistoryAction::Rejected,
                remark: Some(remark),
                signature,
                old_file_path: None,
            },
        )
        .await?;
        tx.commit().await?;

        tracing::info!(assignment = %assignment_id, reviewer = %actor.id, "Assignment rejected");

        self.detail(assignment_id).await
    }

    /// Hand a pending assignment off to another reviewer. Only
    /// `current_reviewer` changes; `reviewer_id` keeps the initial assignee
    /// so the original assignment relationship stays on the record.
    pub async fn forward(
        &self,
        assignment_id: Uuid,
        actor: &Actor,
        new_reviewer_id: Uuid,
        remark: Option<String>,
    ) -> Result<AssignmentDetail> {
        let current = self.load(assignment_id).await?;
        let next = next_status(current.status, WorkflowOp::Forward)?;
        require_current_reviewer(&current, actor)?;
        self.require_reviewer_capable(new_reviewer_id).await?;

        let mut tx = self.db.begin().await?;
        let updated = sqlx::query(
            r#"
            UPDATE assignments
            SET status = $3, current_reviewer = $4, updated_at = NOW()
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(assignment_id)
        .bind(current.status)
        .bind(next)
        .bind(new_reviewer_id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(lost_race(assignment_id, WorkflowOp::Forward));
        }

        append_history(
            &mut tx,
            assignment_id,
            NewHistoryEntry {
                reviewer_id: Some(actor.id),
                action: HistoryAction::Forwarded,
                remark,
                signature: None,
                old_file_path: None,
            },
        )
        .await?;
        tx.commit().await?;

        tracing::info!(
            assignment = %assignment_id,
            from = %actor.id,
            to = %new_reviewer_id,
            "Assignment forwarded"
        );

        self.detail(assignment_id).await
    }

    /// Resubmit a rejected assignment with a new file. The replaced file
    /// reference moves into the history entry's `old_file_path`; the old
    /// blob is retained so earlier entries stay dereferenceable.
    pub async fn resubmit(
        &self,
        assignment_id: Uuid,
        actor: &Actor,
        file: FileRef,
    ) -> Result<AssignmentDetail> {
        let current = self.load(assignment_id).await?;
        require_owner(&current, actor)?;
        let next = next_status(current.status, WorkflowOp::Resubmit)?;
        validate_file(&file)?;

        let old_file_path = current.file_path.clone();

        let mut tx = self.db.begin().await?;
        let updated = sqlx::query(
            r#"
            UPDATE assignments
            SET status = $3, file_path = $4, file_original_name = $5, file_size = $6,
                updated_at = NOW()
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(assignment_id)
        .bind(current.status)
        .bind(next)
        .bind(&file.path)
        .bind(&file.original_name)
        .bind(file.size)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(lost_race(assignment_id, WorkflowOp::Resubmit));
        }

        append_history(
            &mut tx,
            assignment_id,
            NewHistoryEntry {
                reviewer_id: None,
                action: HistoryAction::Resubmitted,
                remark: None,
                signature: None,
                old_file_path,
            },
        )
        .await?;
        tx.commit().await?;

        tracing::info!(assignment = %assignment_id, owner = %actor.id, "Assignment resubmitted");

        self.detail(assignment_id).await
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Fetch an assignment with its ordered history log.
    pub async fn detail(&self, assignment_id: Uuid) -> Result<AssignmentDetail> {
        let assignment = self.load(assignment_id).await?;
        let history = self.history(assignment_id).await?;
        Ok(AssignmentDetail {
            assignment,
            history,
        })
    }

    /// Fetch the ordered history log for an assignment.
    pub async fn history(&self, assignment_id: Uuid) -> Result<Vec<HistoryEntry>> {
        let entries: Vec<HistoryEntry> = sqlx::query_as(&format!(
            "{} WHERE assignment_id = $1 ORDER BY seq",
            SELECT_HISTORY
        ))
        .bind(assignment_id)
        .fetch_all(&self.db)
        .await?;

        Ok(entries)
    }

    async fn load(&self, assignment_id: Uuid) -> Result<Assignment> {
        let assignment: Assignment =
            sqlx::query_as(&format!("{} WHERE id = $1", SELECT_ASSIGNMENT))
                .bind(assignment_id)
                .fetch_optional(&self.db)
                .await?
                .ok_or_else(|| AppError::NotFound("Assignment not found".to_string()))?;

        Ok(assignment)
    }

    /// The target of a submit/forward must exist, be active, and hold a
    /// reviewer-capable role.
    async fn require_reviewer_capable(&self, user_id: Uuid) -> Result<()> {
        let role: Option<Role> =
            sqlx::query_scalar("SELECT role FROM users WHERE id = $1 AND is_active = true")
                .bind(user_id)
                .fetch_optional(&self.db)
                .await?;

        match role {
            None => Err(AppError::Validation(
                "the requested reviewer does not exist".to_string(),
            )),
            Some(role) if !role.can_review() => Err(AppError::Validation(
                "the requested reviewer cannot review assignments".to_string(),
            )),
            Some(_) => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// History persistence
// ---------------------------------------------------------------------------

struct NewHistoryEntry {
    reviewer_id: Option<Uuid>,
    action: HistoryAction,
    remark: Option<String>,
    signature: Option<String>,
    old_file_path: Option<String>,
}

/// Append one history row inside the caller's transaction. The CAS on the
/// assignments row guarantees a single writer per transition, so computing
/// the next seq here cannot race; the unique (assignment_id, seq) constraint
/// backstops it regardless.
async fn append_history(
    tx: &mut Transaction<'_, Postgres>,
    assignment_id: Uuid,
    entry: NewHistoryEntry,
) -> Result<()> {
    let seq: i32 = sqlx::query_scalar(
        "SELECT COALESCE(MAX(seq), 0) + 1 FROM assignment_history WHERE assignment_id = $1",
    )
    .bind(assignment_id)
    .fetch_one(&mut **tx)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO assignment_history (
            assignment_id, seq, reviewer_id, action, remark, signature, old_file_path
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(assignment_id)
    .bind(seq)
    .bind(entry.reviewer_id)
    .bind(entry.action)
    .bind(&entry.remark)
    .bind(&entry.signature)
    .bind(&entry.old_file_path)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
