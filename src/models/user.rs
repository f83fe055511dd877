//! User model and role capabilities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// User role enum.
///
/// Capabilities are derived from the role explicitly rather than by
/// comparing role names in handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Professor,
    Hod,
    Admin,
}

impl Role {
    /// May create drafts and submit/resubmit their own assignments.
    pub fn can_submit(self) -> bool {
        matches!(self, Role::Student)
    }

    /// May be assigned as a reviewer and decide on pending assignments.
    pub fn can_review(self) -> bool {
        matches!(self, Role::Professor | Role::Hod)
    }

    /// May manage users, departments, and delete any assignment.
    pub fn is_admin(self) -> bool {
        matches!(self, Role::Admin)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Professor => "professor",
            Role::Hod => "hod",
            Role::Admin => "admin",
        }
    }
}

/// User entity
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub department_id: Option<Uuid>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Pre-validated acting identity handed to the workflow engine.
///
/// Built from the auth middleware's decoded token; the engine re-checks it
/// against the record's owner/reviewer fields on every transition.
#[derive(Debug, Clone, Copy)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
}

#[cfg(test)]
mod tests {
    use super::*;

    // -----------------------------------------------------------------------
    // Role capabilities
    // -----------------------------------------------------------------------

    #[test]
    fn test_only_students_can_submit() {
        assert!(Role::Student.can_submit());
        assert!(!Role::Professor.can_submit());
        assert!(!Role::Hod.can_submit());
        assert!(!Role::Admin.can_submit());
    }

    #[test]
    fn test_professors_and_hods_can_review() {
        assert!(Role::Professor.can_review());
        assert!(Role::Hod.can_review());
        assert!(!Role::Student.can_review());
        assert!(!Role::Admin.can_review());
    }

    #[test]
    fn test_only_admins_are_admin() {
        assert!(Role::Admin.is_admin());
        assert!(!Role::Student.is_admin());
        assert!(!Role::Professor.is_admin());
        assert!(!Role::Hod.is_admin());
    }

    #[test]
    fn test_role_as_str() {
        assert_eq!(Role::Student.as_str(), "student");
        assert_eq!(Role::Professor.as_str(), "professor");
        assert_eq!(Role::Hod.as_str(), "hod");
        assert_eq!(Role::Admin.as_str(), "admin");
    }

    // -----------------------------------------------------------------------
    // Serde
    // -----------------------------------------------------------------------

    #[test]
    fn test_role_serde_lowercase() {
        assert_eq!(serde_json::to_value(Role::Hod).unwrap(), "hod");
        let role: Role = serde_json::from_value(serde_json::json!("professor")).unwrap();
        assert_eq!(role, Role::Professor);
    }

    #[test]
    fn test_user_serialize_skips_password_hash() {
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
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["email"], "asha@example.edu");
        assert_eq!(json["role"], "student");
    }
}
