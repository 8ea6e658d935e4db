//! Core traits for the Kontor platform
//!
//! Repository traits follow a uniform existence-validation contract:
//! `validate_exists` fails NotFound when the record is missing or tombstoned;
//! `validate_all_exist` is atomic all-or-nothing - it fails NotFound ("one or
//! more X not found") when any requested id is missing, and performs no
//! partial work.

use crate::{error::Result, ids::*, list::*, models::*};
use async_trait::async_trait;
use uuid::Uuid;

// =============================================================================
// Identity & Organization
// =============================================================================

/// Staff account operations
#[async_trait]
pub trait StaffRepository: Send + Sync {
    async fn create(&self, staff: NewStaff) -> Result<Staff>;
    async fn validate_exists(&self, id: StaffId) -> Result<Staff>;
    async fn validate_all_exist(&self, ids: &[StaffId]) -> Result<Vec<Staff>>;
    /// Lookup by email among non-deleted staff; Ok(None) when absent
    async fn find_by_email(&self, email: &str) -> Result<Option<Staff>>;
    async fn update(&self, id: StaffId, update: StaffUpdate) -> Result<Staff>;
    async fn soft_delete(&self, id: StaffId, deleted_by: StaffId) -> Result<Staff>;
    async fn get_list(&self, params: &ListParams, caller_id: StaffId) -> Result<ListResult<Staff>>;
}

/// Group operations
#[async_trait]
pub trait GroupRepository: Send + Sync {
    async fn create(&self, group: NewLookupEntry) -> Result<Group>;
    async fn validate_exists(&self, id: GroupId) -> Result<Group>;
    async fn validate_all_exist(&self, ids: &[GroupId]) -> Result<Vec<Group>>;
    async fn update(&self, id: GroupId, update: LookupEntryUpdate) -> Result<Group>;
    async fn soft_delete(&self, id: GroupId, deleted_by: StaffId) -> Result<Group>;
    async fn get_list(&self, params: &ListParams, caller_id: StaffId) -> Result<ListResult<Group>>;
}

/// Staff position lookup operations
#[async_trait]
pub trait StaffPositionRepository: Send + Sync {
    async fn create(&self, entry: NewLookupEntry) -> Result<StaffPosition>;
    async fn validate_exists(&self, id: StaffPositionId) -> Result<StaffPosition>;
    async fn validate_all_exist(&self, ids: &[StaffPositionId]) -> Result<Vec<StaffPosition>>;
    async fn update(&self, id: StaffPositionId, update: LookupEntryUpdate) -> Result<StaffPosition>;
    async fn soft_delete(&self, id: StaffPositionId, deleted_by: StaffId) -> Result<StaffPosition>;
    async fn get_list(
        &self,
        params: &ListParams,
        caller_id: StaffId,
    ) -> Result<ListResult<StaffPosition>>;
}

/// Staff department lookup operations
#[async_trait]
pub trait StaffDepartmentRepository: Send + Sync {
    async fn create(&self, entry: NewLookupEntry) -> Result<StaffDepartment>;
    async fn validate_exists(&self, id: StaffDepartmentId) -> Result<StaffDepartment>;
    async fn validate_all_exist(&self, ids: &[StaffDepartmentId])
        -> Result<Vec<StaffDepartment>>;
    async fn update(
        &self,
        id: StaffDepartmentId,
        update: LookupEntryUpdate,
    ) -> Result<StaffDepartment>;
    async fn soft_delete(
        &self,
        id: StaffDepartmentId,
        deleted_by: StaffId,
    ) -> Result<StaffDepartment>;
    async fn get_list(
        &self,
        params: &ListParams,
        caller_id: StaffId,
    ) -> Result<ListResult<StaffDepartment>>;
}

/// Ads-language taxonomy lookup operations. The other taxonomy lookups
/// follow the same contract.
#[async_trait]
pub trait AdsLanguageRepository: Send + Sync {
    async fn create(&self, entry: NewLookupEntry) -> Result<AdsLanguage>;
    async fn validate_exists(&self, id: AdsLanguageId) -> Result<AdsLanguage>;
    async fn validate_all_exist(&self, ids: &[AdsLanguageId]) -> Result<Vec<AdsLanguage>>;
    async fn update(&self, id: AdsLanguageId, update: LookupEntryUpdate) -> Result<AdsLanguage>;
    async fn soft_delete(&self, id: AdsLanguageId, deleted_by: StaffId) -> Result<AdsLanguage>;
    async fn get_list(
        &self,
        params: &ListParams,
        caller_id: StaffId,
    ) -> Result<ListResult<AdsLanguage>>;
}

// =============================================================================
// Permission Catalog
// =============================================================================

/// Read-only permission catalog lookups.
#[async_trait]
pub trait PermissionCatalog: Send + Sync {
    async fn validate_exists(&self, id: PermissionId) -> Result<PermissionDetail>;
    async fn validate_all_exist(&self, ids: &[PermissionId]) -> Result<Vec<PermissionDetail>>;
    /// Catalog lookup by names; Ok(None) when no such entry is seeded
    async fn find_by_resource_and_action(
        &self,
        resource_name: &str,
        action_name: &str,
    ) -> Result<Option<PermissionDetail>>;
    async fn get_list(&self, params: &ListParams) -> Result<ListResult<PermissionDetail>>;
}

// =============================================================================
// Grant Store
// =============================================================================

/// Storage for grants, parameterized by subject kind.
#[async_trait]
pub trait GrantStore: Send + Sync {
    /// Atomic upsert keyed on (subject, permission). An update overwrites
    /// `is_allowed_all` and `allow_ids` and stamps the actor as updater,
    /// preserving the record's creation audit fields.
    async fn upsert(&self, subject: SubjectRef, assignment: &GrantAssignment) -> Result<Grant>;

    /// Of the given permission ids, the ones the subject already holds live
    /// grants for.
    async fn assigned_permission_ids(
        &self,
        subject: SubjectRef,
        permission_ids: &[PermissionId],
    ) -> Result<Vec<PermissionId>>;

    /// Bulk-insert allow-all grants; callers are expected to have removed
    /// already-assigned permission ids first.
    async fn insert_allow_all(
        &self,
        subject: SubjectRef,
        permission_ids: &[PermissionId],
        actor_id: StaffId,
    ) -> Result<()>;

    /// Fails NotFound unless a live grant with this id exists for this
    /// subject kind.
    async fn validate_exists(&self, kind: SubjectKind, id: GrantId) -> Result<Grant>;

    async fn list_by_subject(&self, subject: SubjectRef) -> Result<Vec<GrantDetail>>;

    /// Grants of every group the staff belongs to, flattened.
    async fn list_inherited_by_staff(&self, staff_id: StaffId) -> Result<Vec<GrantDetail>>;

    async fn soft_delete(&self, id: GrantId, deleted_by: StaffId) -> Result<Grant>;

    async fn get_list(
        &self,
        kind: SubjectKind,
        params: &ListParams,
    ) -> Result<ListResult<GrantDetail>>;
}

// =============================================================================
// Group Membership Registry
// =============================================================================

/// Many-to-many association between staff and groups.
#[async_trait]
pub trait MembershipRegistry: Send + Sync {
    /// Upsert keyed on (staff, group)
    async fn upsert(
        &self,
        staff_id: StaffId,
        group_id: GroupId,
        actor_id: StaffId,
    ) -> Result<GroupMembership>;
    async fn validate_exists(&self, id: GroupMembershipId) -> Result<GroupMembership>;
    /// Hard-deletes the edge to revoke membership
    async fn delete(&self, id: GroupMembershipId) -> Result<GroupMembership>;
    async fn list_by_staff(&self, staff_id: StaffId) -> Result<Vec<GroupMembership>>;
    async fn list_by_group(&self, group_id: GroupId) -> Result<Vec<GroupMembership>>;
    async fn get_list(&self, params: &ListParams) -> Result<ListResult<GroupMembership>>;
}

// =============================================================================
// Record Existence (allow-ids validation capability)
// =============================================================================

/// Existence check over raw record ids, dispatched by resource name when a
/// scoped grant's allow-list is validated. Implementations fail NotFound
/// (atomic, all-or-nothing) when any id is missing or tombstoned.
#[async_trait]
pub trait RecordExistence: Send + Sync {
    async fn validate_ids_exist(&self, ids: &[Uuid]) -> Result<()>;
}
