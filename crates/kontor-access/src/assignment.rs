//! Grant assignment engine
//!
//! Creates or updates exactly one grant per (subject, permission). The
//! scoped allow-list is validated against the resource's own existence
//! check via the registry, and a configurable cascade policy upserts the
//! implied weaker grants after the primary assignment.

use std::sync::Arc;

use tracing::{debug, instrument};

use kontor_core::{
    Grant, GrantAssignment, GrantDetail, GrantId, GrantStore, GroupId, GroupRepository,
    ListParams, ListResult, PermissionCatalog, PermissionDetail, PermissionId, Result, StaffId,
    StaffRepository, SubjectKind, SubjectRef,
};

use crate::cascade::CascadePolicy;
use crate::registry::AllowIdsRegistry;

fn detail_from(grant: Grant, permission: PermissionDetail) -> GrantDetail {
    GrantDetail {
        id: grant.id,
        subject: grant.subject,
        is_allowed_all: grant.is_allowed_all,
        allow_ids: grant.allow_ids,
        permission,
        created_by_id: grant.created_by_id,
        updated_by_id: grant.updated_by_id,
        created_at: grant.created_at,
        updated_at: grant.updated_at,
    }
}

/// Engine behind the StaffPermission and GroupPermission operations.
pub struct GrantAssignmentEngine {
    staff: Arc<dyn StaffRepository>,
    groups: Arc<dyn GroupRepository>,
    catalog: Arc<dyn PermissionCatalog>,
    grants: Arc<dyn GrantStore>,
    registry: Arc<AllowIdsRegistry>,
    cascade: Arc<dyn CascadePolicy>,
}

impl GrantAssignmentEngine {
    pub fn new(
        staff: Arc<dyn StaffRepository>,
        groups: Arc<dyn GroupRepository>,
        catalog: Arc<dyn PermissionCatalog>,
        grants: Arc<dyn GrantStore>,
        registry: Arc<AllowIdsRegistry>,
        cascade: Arc<dyn CascadePolicy>,
    ) -> Self {
        Self {
            staff,
            groups,
            catalog,
            grants,
            registry,
            cascade,
        }
    }

    async fn validate_subject(&self, subject: SubjectRef) -> Result<()> {
        match subject.kind {
            SubjectKind::Staff => {
                self.staff
                    .validate_exists(StaffId::from_uuid(subject.id))
                    .await?;
            }
            SubjectKind::Group => {
                self.groups
                    .validate_exists(GroupId::from_uuid(subject.id))
                    .await?;
            }
        }
        Ok(())
    }

    /// Create or update the grant for (subject, permission).
    ///
    /// Validates the subject, the acting staff and the permission; when the
    /// grant is scoped, every allow-id must exist for the permission's
    /// resource. The upsert overwrites scoping on an existing grant instead
    /// of appending a second row.
    #[instrument(skip(self, assignment))]
    pub async fn assign(
        &self,
        subject: SubjectRef,
        assignment: GrantAssignment,
    ) -> Result<GrantDetail> {
        self.validate_subject(subject).await?;
        self.staff.validate_exists(assignment.actor_id).await?;
        let permission = self.catalog.validate_exists(assignment.permission_id).await?;

        if !assignment.is_allowed_all && !assignment.allow_ids.is_empty() {
            self.registry
                .validate(&permission.resource_name, &assignment.allow_ids)
                .await?;
        }

        let grant = self.grants.upsert(subject, &assignment).await?;
        self.cascade_implied(subject, &permission, &assignment).await?;

        Ok(detail_from(grant, permission))
    }

    /// Upsert the grants implied by the assigned action. Best-effort: an
    /// implied permission missing from the catalog is skipped, not escalated,
    /// so a sparse catalog cannot fail an otherwise-valid assignment.
    async fn cascade_implied(
        &self,
        subject: SubjectRef,
        permission: &PermissionDetail,
        assignment: &GrantAssignment,
    ) -> Result<()> {
        for action in self.cascade.implied_actions(&permission.action_name) {
            let implied = self
                .catalog
                .find_by_resource_and_action(&permission.resource_name, action)
                .await?;

            match implied {
                Some(implied) if implied.id != permission.id => {
                    let implied_assignment = GrantAssignment {
                        permission_id: implied.id,
                        is_allowed_all: assignment.is_allowed_all,
                        allow_ids: assignment.allow_ids.clone(),
                        actor_id: assignment.actor_id,
                    };
                    self.grants.upsert(subject, &implied_assignment).await?;
                }
                Some(_) => {}
                None => {
                    debug!(
                        resource = %permission.resource_name,
                        action,
                        "implied permission not in catalog, skipping"
                    );
                }
            }
        }
        Ok(())
    }

    /// Bulk-assign permissions as allow-all grants. Already-assigned
    /// permissions are left untouched; the subject's refreshed grant list is
    /// returned.
    #[instrument(skip(self, permission_ids))]
    pub async fn assign_many(
        &self,
        subject: SubjectRef,
        permission_ids: &[PermissionId],
        actor_id: StaffId,
    ) -> Result<Vec<GrantDetail>> {
        self.validate_subject(subject).await?;
        self.staff.validate_exists(actor_id).await?;
        self.catalog.validate_all_exist(permission_ids).await?;

        let already_assigned = self
            .grants
            .assigned_permission_ids(subject, permission_ids)
            .await?;

        let mut to_assign: Vec<PermissionId> = Vec::new();
        for permission_id in permission_ids {
            if !already_assigned.contains(permission_id) && !to_assign.contains(permission_id) {
                to_assign.push(*permission_id);
            }
        }

        if !to_assign.is_empty() {
            self.grants
                .insert_allow_all(subject, &to_assign, actor_id)
                .await?;
        }

        self.grants.list_by_subject(subject).await
    }

    /// Withdraw a grant entirely, tombstoning the row.
    #[instrument(skip(self))]
    pub async fn revoke(
        &self,
        kind: SubjectKind,
        grant_id: GrantId,
        actor_id: StaffId,
    ) -> Result<Grant> {
        self.grants.validate_exists(kind, grant_id).await?;
        self.grants.soft_delete(grant_id, actor_id).await
    }

    /// The staff member's direct grants; NotFound when the staff is missing
    /// or deleted.
    #[instrument(skip(self))]
    pub async fn list_by_staff(&self, staff_id: StaffId) -> Result<Vec<GrantDetail>> {
        self.staff.validate_exists(staff_id).await?;
        self.grants.list_by_subject(SubjectRef::staff(staff_id)).await
    }

    /// The group's grants; NotFound when the group is missing or deleted.
    #[instrument(skip(self))]
    pub async fn list_by_group(&self, group_id: GroupId) -> Result<Vec<GrantDetail>> {
        self.groups.validate_exists(group_id).await?;
        self.grants.list_by_subject(SubjectRef::group(group_id)).await
    }

    /// Grants a staff member inherits through group membership.
    #[instrument(skip(self))]
    pub async fn list_inherited_by_staff(&self, staff_id: StaffId) -> Result<Vec<GrantDetail>> {
        self.grants.list_inherited_by_staff(staff_id).await
    }

    #[instrument(skip(self, params))]
    pub async fn get_list(
        &self,
        kind: SubjectKind,
        params: &ListParams,
    ) -> Result<ListResult<GrantDetail>> {
        self.grants.get_list(kind, params).await
    }
}

impl std::fmt::Debug for GrantAssignmentEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GrantAssignmentEngine").finish()
    }
}
