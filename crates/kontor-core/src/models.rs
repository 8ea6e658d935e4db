//! Domain models for the Kontor back-office platform
//!
//! Every mutable entity carries an audit trail (created/updated/deleted by +
//! timestamps). Soft-deletable entities are tombstoned via `deleted_at` /
//! `deleted_by_id` and are never hard-deleted; reads must treat a tombstoned
//! row as absent.

use crate::ids::*;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// Staff & Organization Models
// =============================================================================

/// Staff represents an employee account.
///
/// A staff member with `is_root` set bypasses every access check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Staff {
    pub id: StaffId,
    /// Globally unique among non-deleted staff
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Credential hash - never serialized out
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub bio: Option<String>,
    pub position_id: StaffPositionId,
    pub department_id: StaffDepartmentId,
    pub is_root: bool,
    pub created_by_id: Option<StaffId>,
    pub updated_by_id: Option<StaffId>,
    pub deleted_by_id: Option<StaffId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Staff {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// StaffPosition is a seeded lookup entity (e.g. "Manager", "Employee").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffPosition {
    pub id: StaffPositionId,
    pub name: String,
    pub description: Option<String>,
    pub created_by_id: Option<StaffId>,
    pub updated_by_id: Option<StaffId>,
    pub deleted_by_id: Option<StaffId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// StaffDepartment is a seeded lookup entity (e.g. "IT", "Marketing").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffDepartment {
    pub id: StaffDepartmentId,
    pub name: String,
    pub description: Option<String>,
    pub created_by_id: Option<StaffId>,
    pub updated_by_id: Option<StaffId>,
    pub deleted_by_id: Option<StaffId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Group represents a named collection of staff sharing permissions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub description: Option<String>,
    pub created_by_id: Option<StaffId>,
    pub updated_by_id: Option<StaffId>,
    pub deleted_by_id: Option<StaffId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Group {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Membership edge binding one Staff to one Group.
///
/// At most one edge per (staff, group) pair; re-assignment upserts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupMembership {
    pub id: GroupMembershipId,
    pub staff_id: StaffId,
    pub group_id: GroupId,
    pub created_by_id: Option<StaffId>,
    pub updated_by_id: Option<StaffId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Permission Catalog Models
// =============================================================================

/// A named domain of records permissions are defined against
/// (e.g. "staff", "group", "staff-position", "ads-language").
///
/// Resources are data-seeded, not a compile-time enum: new resources arrive by
/// seeding, so names are compared by string equality at runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionResource {
    pub id: PermissionResourceId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// An action type a permission can cover (create, read, edit, delete, assign).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionAction {
    pub id: PermissionActionId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// An immutable catalog entry identifying one (resource, action) pair.
///
/// Permissions are seeded, never created at runtime by end users.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Permission {
    pub id: PermissionId,
    pub name: String,
    pub resource_id: PermissionResourceId,
    pub action_id: PermissionActionId,
    pub created_at: DateTime<Utc>,
}

/// Permission with its resource and action names resolved - the projection
/// consumed by grant listings and by access resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionDetail {
    pub id: PermissionId,
    pub name: String,
    pub resource_id: PermissionResourceId,
    pub resource_name: String,
    pub action_id: PermissionActionId,
    pub action_name: String,
}

// =============================================================================
// Grant Models
// =============================================================================

/// The kind of subject a grant binds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectKind {
    Staff,
    Group,
}

impl SubjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubjectKind::Staff => "staff",
            SubjectKind::Group => "group",
        }
    }

    /// Entity name used in not-found messages for this subject kind's grants.
    pub fn grant_entity_name(&self) -> &'static str {
        match self {
            SubjectKind::Staff => "staff permission",
            SubjectKind::Group => "group permission",
        }
    }
}

impl std::fmt::Display for SubjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A subject (staff member or group) a grant is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubjectRef {
    pub kind: SubjectKind,
    pub id: Uuid,
}

impl SubjectRef {
    pub fn staff(id: StaffId) -> Self {
        Self {
            kind: SubjectKind::Staff,
            id: id.into_uuid(),
        }
    }

    pub fn group(id: GroupId) -> Self {
        Self {
            kind: SubjectKind::Group,
            id: id.into_uuid(),
        }
    }
}

/// Grant binds one subject to one permission, with optional record scoping.
///
/// Invariant: at most one live grant per (subject, permission) pair -
/// assignment is an upsert, never an append. `allow_ids` is meaningful only
/// when `is_allowed_all` is false; empty means no scoped access.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grant {
    pub id: GrantId,
    pub subject: SubjectRef,
    pub permission_id: PermissionId,
    /// True means the subject may act on every record of the resource type
    pub is_allowed_all: bool,
    /// Scoped allow-list of record identifiers
    pub allow_ids: Vec<Uuid>,
    pub created_by_id: Option<StaffId>,
    pub updated_by_id: Option<StaffId>,
    pub deleted_by_id: Option<StaffId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Grant with its permission's resource and action names resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrantDetail {
    pub id: GrantId,
    pub subject: SubjectRef,
    pub is_allowed_all: bool,
    pub allow_ids: Vec<Uuid>,
    pub permission: PermissionDetail,
    pub created_by_id: Option<StaffId>,
    pub updated_by_id: Option<StaffId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GrantDetail {
    /// Whether this grant covers the requested (resource, action) pair.
    ///
    /// Scoping (`is_allowed_all` / `allow_ids`) is deliberately not consulted
    /// here: the yes/no gate answers "may the staff perform this action type
    /// on this resource kind at all"; which records are visible is a
    /// per-query concern handled by the list-filtering layer.
    pub fn matches(&self, resource: &str, action: &str) -> bool {
        self.permission.resource_name == resource && self.permission.action_name == action
    }
}

// =============================================================================
// Taxonomy Models
// =============================================================================

/// AdsLanguage is a taxonomy lookup entity for advertising content.
///
/// The remaining taxonomy lookups (industry, tone, platform, ...) follow this
/// exact template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdsLanguage {
    pub id: AdsLanguageId,
    pub name: String,
    pub description: Option<String>,
    pub created_by_id: Option<StaffId>,
    pub updated_by_id: Option<StaffId>,
    pub deleted_by_id: Option<StaffId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Change Sets
// =============================================================================

/// Fields for creating a staff member. The password arrives pre-hashed; the
/// gateway owns credential hashing.
#[derive(Debug, Clone, Deserialize)]
pub struct NewStaff {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub bio: Option<String>,
    pub position_id: StaffPositionId,
    pub department_id: StaffDepartmentId,
    pub created_by_id: Option<StaffId>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StaffUpdate {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// None keeps the existing credential hash
    pub password_hash: Option<String>,
    pub bio: Option<String>,
    pub position_id: StaffPositionId,
    pub department_id: StaffDepartmentId,
    pub updated_by_id: StaffId,
}

/// Fields shared by the name/description lookup entities
/// (positions, departments, groups, taxonomy entries).
#[derive(Debug, Clone, Deserialize)]
pub struct NewLookupEntry {
    pub name: String,
    pub description: Option<String>,
    pub created_by_id: Option<StaffId>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LookupEntryUpdate {
    pub name: String,
    pub description: Option<String>,
    pub updated_by_id: StaffId,
}

/// Assignment request handled by the grant assignment engine.
#[derive(Debug, Clone)]
pub struct GrantAssignment {
    pub permission_id: PermissionId,
    pub is_allowed_all: bool,
    pub allow_ids: Vec<Uuid>,
    pub actor_id: StaffId,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detail(resource: &str, action: &str) -> GrantDetail {
        GrantDetail {
            id: GrantId::new(),
            subject: SubjectRef::staff(StaffId::new()),
            is_allowed_all: false,
            allow_ids: vec![],
            permission: PermissionDetail {
                id: PermissionId::new(),
                name: format!("{resource}-{action}"),
                resource_id: PermissionResourceId::new(),
                resource_name: resource.to_string(),
                action_id: PermissionActionId::new(),
                action_name: action.to_string(),
            },
            created_by_id: None,
            updated_by_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_grant_match_ignores_scoping() {
        let mut g = detail("staff-position", "edit");
        assert!(g.matches("staff-position", "edit"));
        assert!(!g.matches("staff-position", "delete"));
        assert!(!g.matches("staff", "edit"));

        // A scoped grant still passes the yes/no gate
        g.is_allowed_all = false;
        g.allow_ids = vec![Uuid::now_v7()];
        assert!(g.matches("staff-position", "edit"));
    }

    #[test]
    fn test_subject_kind_serialization() {
        let json = serde_json::to_string(&SubjectKind::Staff).unwrap();
        assert_eq!(json, "\"staff\"");
        let parsed: SubjectKind = serde_json::from_str("\"group\"").unwrap();
        assert_eq!(parsed, SubjectKind::Group);
    }

    #[test]
    fn test_staff_password_never_serialized() {
        let staff = Staff {
            id: StaffId::new(),
            email: "jane@example.com".to_string(),
            first_name: "Jane".to_string(),
            last_name: "Smith".to_string(),
            password_hash: "secret-hash".to_string(),
            bio: None,
            position_id: StaffPositionId::new(),
            department_id: StaffDepartmentId::new(),
            is_root: false,
            created_by_id: None,
            updated_by_id: None,
            deleted_by_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
        };
        let json = serde_json::to_string(&staff).unwrap();
        assert!(!json.contains("secret-hash"));
        assert!(!json.contains("password_hash"));
    }
}
