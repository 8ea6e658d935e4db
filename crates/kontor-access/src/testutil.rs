//! In-memory fakes backing the engine unit tests

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use kontor_core::*;

/// Shared in-memory world the fake repositories operate on.
#[derive(Default)]
pub struct FakeWorld {
    pub staff: Mutex<HashMap<Uuid, Staff>>,
    pub groups: Mutex<HashMap<Uuid, Group>>,
    pub permissions: Mutex<HashMap<Uuid, PermissionDetail>>,
    pub grants: Mutex<Vec<Grant>>,
    /// (staff_id, group_id) membership edges
    pub memberships: Mutex<Vec<(Uuid, Uuid)>>,
}

impl FakeWorld {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_staff(self: &Arc<Self>, is_root: bool) -> StaffId {
        let id = StaffId::new();
        let now = Utc::now();
        let staff = Staff {
            id,
            email: format!("{}@example.com", id),
            first_name: "Test".to_string(),
            last_name: "Staff".to_string(),
            password_hash: "hash".to_string(),
            bio: None,
            position_id: StaffPositionId::new(),
            department_id: StaffDepartmentId::new(),
            is_root,
            created_by_id: None,
            updated_by_id: None,
            deleted_by_id: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        self.staff.lock().unwrap().insert(*id.as_uuid(), staff);
        id
    }

    pub fn add_group(self: &Arc<Self>) -> GroupId {
        let id = GroupId::new();
        let now = Utc::now();
        let group = Group {
            id,
            name: format!("group-{}", id),
            description: None,
            created_by_id: None,
            updated_by_id: None,
            deleted_by_id: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        self.groups.lock().unwrap().insert(*id.as_uuid(), group);
        id
    }

    pub fn tombstone_group(self: &Arc<Self>, id: GroupId) {
        if let Some(group) = self.groups.lock().unwrap().get_mut(id.as_uuid()) {
            group.deleted_at = Some(Utc::now());
        }
    }

    pub fn add_permission(self: &Arc<Self>, resource: &str, action: &str) -> PermissionId {
        let id = PermissionId::new();
        let detail = PermissionDetail {
            id,
            name: format!("{resource}-{action}"),
            resource_id: PermissionResourceId::new(),
            resource_name: resource.to_string(),
            action_id: PermissionActionId::new(),
            action_name: action.to_string(),
        };
        self.permissions.lock().unwrap().insert(*id.as_uuid(), detail);
        id
    }

    pub fn add_membership(self: &Arc<Self>, staff_id: StaffId, group_id: GroupId) {
        self.memberships
            .lock()
            .unwrap()
            .push((*staff_id.as_uuid(), *group_id.as_uuid()));
    }

    pub fn remove_membership(self: &Arc<Self>, staff_id: StaffId, group_id: GroupId) {
        self.memberships
            .lock()
            .unwrap()
            .retain(|(s, g)| !(s == staff_id.as_uuid() && g == group_id.as_uuid()));
    }

    pub fn live_grants(self: &Arc<Self>) -> Vec<Grant> {
        self.grants
            .lock()
            .unwrap()
            .iter()
            .filter(|g| g.deleted_at.is_none())
            .cloned()
            .collect()
    }

    fn detail_for(&self, grant: &Grant) -> GrantDetail {
        let permission = self
            .permissions
            .lock()
            .unwrap()
            .get(grant.permission_id.as_uuid())
            .cloned()
            .expect("grant references a seeded permission");
        GrantDetail {
            id: grant.id,
            subject: grant.subject,
            is_allowed_all: grant.is_allowed_all,
            allow_ids: grant.allow_ids.clone(),
            permission,
            created_by_id: grant.created_by_id,
            updated_by_id: grant.updated_by_id,
            created_at: grant.created_at,
            updated_at: grant.updated_at,
        }
    }
}

fn unsupported<T>() -> Result<T> {
    Err(KontorError::internal_error("not supported by fake"))
}

// =============================================================================
// Staff
// =============================================================================

pub struct FakeStaffRepo(pub Arc<FakeWorld>);

#[async_trait]
impl StaffRepository for FakeStaffRepo {
    async fn create(&self, _staff: NewStaff) -> Result<Staff> {
        unsupported()
    }

    async fn validate_exists(&self, id: StaffId) -> Result<Staff> {
        match self.0.staff.lock().unwrap().get(id.as_uuid()) {
            Some(staff) if staff.deleted_at.is_none() => Ok(staff.clone()),
            _ => Err(KontorError::not_found("staff")),
        }
    }

    async fn validate_all_exist(&self, ids: &[StaffId]) -> Result<Vec<Staff>> {
        let staff = self.0.staff.lock().unwrap();
        let mut found = Vec::new();
        for id in ids {
            match staff.get(id.as_uuid()) {
                Some(record) if record.deleted_at.is_none() => found.push(record.clone()),
                _ => return Err(KontorError::not_found("one or more staff")),
            }
        }
        Ok(found)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Staff>> {
        Ok(self
            .0
            .staff
            .lock()
            .unwrap()
            .values()
            .find(|s| s.email == email && s.deleted_at.is_none())
            .cloned())
    }

    async fn update(&self, _id: StaffId, _update: StaffUpdate) -> Result<Staff> {
        unsupported()
    }

    async fn soft_delete(&self, _id: StaffId, _deleted_by: StaffId) -> Result<Staff> {
        unsupported()
    }

    async fn get_list(
        &self,
        _params: &ListParams,
        _caller_id: StaffId,
    ) -> Result<ListResult<Staff>> {
        unsupported()
    }
}

#[async_trait]
impl RecordExistence for FakeStaffRepo {
    async fn validate_ids_exist(&self, ids: &[Uuid]) -> Result<()> {
        let staff = self.0.staff.lock().unwrap();
        for id in ids {
            match staff.get(id) {
                Some(record) if record.deleted_at.is_none() => {}
                _ => return Err(KontorError::not_found("one or more staff")),
            }
        }
        Ok(())
    }
}

// =============================================================================
// Groups
// =============================================================================

pub struct FakeGroupRepo(pub Arc<FakeWorld>);

#[async_trait]
impl GroupRepository for FakeGroupRepo {
    async fn create(&self, _group: NewLookupEntry) -> Result<Group> {
        unsupported()
    }

    async fn validate_exists(&self, id: GroupId) -> Result<Group> {
        match self.0.groups.lock().unwrap().get(id.as_uuid()) {
            Some(group) if group.deleted_at.is_none() => Ok(group.clone()),
            _ => Err(KontorError::not_found("group")),
        }
    }

    async fn validate_all_exist(&self, ids: &[GroupId]) -> Result<Vec<Group>> {
        let groups = self.0.groups.lock().unwrap();
        let mut found = Vec::new();
        for id in ids {
            match groups.get(id.as_uuid()) {
                Some(record) if record.deleted_at.is_none() => found.push(record.clone()),
                _ => return Err(KontorError::not_found("one or more groups")),
            }
        }
        Ok(found)
    }

    async fn update(&self, _id: GroupId, _update: LookupEntryUpdate) -> Result<Group> {
        unsupported()
    }

    async fn soft_delete(&self, _id: GroupId, _deleted_by: StaffId) -> Result<Group> {
        unsupported()
    }

    async fn get_list(
        &self,
        _params: &ListParams,
        _caller_id: StaffId,
    ) -> Result<ListResult<Group>> {
        unsupported()
    }
}

// =============================================================================
// Permission Catalog
// =============================================================================

pub struct FakeCatalog(pub Arc<FakeWorld>);

#[async_trait]
impl PermissionCatalog for FakeCatalog {
    async fn validate_exists(&self, id: PermissionId) -> Result<PermissionDetail> {
        self.0
            .permissions
            .lock()
            .unwrap()
            .get(id.as_uuid())
            .cloned()
            .ok_or_else(|| KontorError::not_found("permission"))
    }

    async fn validate_all_exist(&self, ids: &[PermissionId]) -> Result<Vec<PermissionDetail>> {
        let permissions = self.0.permissions.lock().unwrap();
        let mut found = Vec::new();
        for id in ids {
            match permissions.get(id.as_uuid()) {
                Some(detail) => found.push(detail.clone()),
                None => return Err(KontorError::not_found("one or more permissions")),
            }
        }
        Ok(found)
    }

    async fn find_by_resource_and_action(
        &self,
        resource_name: &str,
        action_name: &str,
    ) -> Result<Option<PermissionDetail>> {
        Ok(self
            .0
            .permissions
            .lock()
            .unwrap()
            .values()
            .find(|p| p.resource_name == resource_name && p.action_name == action_name)
            .cloned())
    }

    async fn get_list(&self, _params: &ListParams) -> Result<ListResult<PermissionDetail>> {
        unsupported()
    }
}

// =============================================================================
// Grant Store
// =============================================================================

pub struct FakeGrantStore(pub Arc<FakeWorld>);

#[async_trait]
impl GrantStore for FakeGrantStore {
    async fn upsert(&self, subject: SubjectRef, assignment: &GrantAssignment) -> Result<Grant> {
        let mut grants = self.0.grants.lock().unwrap();
        let now = Utc::now();

        if let Some(existing) = grants.iter_mut().find(|g| {
            g.subject == subject
                && g.permission_id == assignment.permission_id
                && g.deleted_at.is_none()
        }) {
            existing.is_allowed_all = assignment.is_allowed_all;
            existing.allow_ids = assignment.allow_ids.clone();
            existing.updated_by_id = Some(assignment.actor_id);
            existing.updated_at = now;
            return Ok(existing.clone());
        }

        let grant = Grant {
            id: GrantId::new(),
            subject,
            permission_id: assignment.permission_id,
            is_allowed_all: assignment.is_allowed_all,
            allow_ids: assignment.allow_ids.clone(),
            created_by_id: Some(assignment.actor_id),
            updated_by_id: Some(assignment.actor_id),
            deleted_by_id: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        grants.push(grant.clone());
        Ok(grant)
    }

    async fn assigned_permission_ids(
        &self,
        subject: SubjectRef,
        permission_ids: &[PermissionId],
    ) -> Result<Vec<PermissionId>> {
        Ok(self
            .0
            .grants
            .lock()
            .unwrap()
            .iter()
            .filter(|g| {
                g.subject == subject
                    && g.deleted_at.is_none()
                    && permission_ids.contains(&g.permission_id)
            })
            .map(|g| g.permission_id)
            .collect())
    }

    async fn insert_allow_all(
        &self,
        subject: SubjectRef,
        permission_ids: &[PermissionId],
        actor_id: StaffId,
    ) -> Result<()> {
        for permission_id in permission_ids {
            self.upsert(
                subject,
                &GrantAssignment {
                    permission_id: *permission_id,
                    is_allowed_all: true,
                    allow_ids: vec![],
                    actor_id,
                },
            )
            .await?;
        }
        Ok(())
    }

    async fn validate_exists(&self, kind: SubjectKind, id: GrantId) -> Result<Grant> {
        self.0
            .grants
            .lock()
            .unwrap()
            .iter()
            .find(|g| g.id == id && g.subject.kind == kind && g.deleted_at.is_none())
            .cloned()
            .ok_or_else(|| KontorError::not_found(kind.grant_entity_name()))
    }

    async fn list_by_subject(&self, subject: SubjectRef) -> Result<Vec<GrantDetail>> {
        Ok(self
            .0
            .grants
            .lock()
            .unwrap()
            .iter()
            .filter(|g| g.subject == subject && g.deleted_at.is_none())
            .map(|g| self.0.detail_for(g))
            .collect())
    }

    async fn list_inherited_by_staff(&self, staff_id: StaffId) -> Result<Vec<GrantDetail>> {
        let memberships = self.0.memberships.lock().unwrap().clone();
        let group_ids: Vec<Uuid> = memberships
            .iter()
            .filter(|(s, _)| s == staff_id.as_uuid())
            .map(|(_, g)| *g)
            .collect();

        let groups = self.0.groups.lock().unwrap();
        let live_group_ids: Vec<Uuid> = group_ids
            .into_iter()
            .filter(|id| groups.get(id).map(|g| g.deleted_at.is_none()).unwrap_or(false))
            .collect();
        drop(groups);

        Ok(self
            .0
            .grants
            .lock()
            .unwrap()
            .iter()
            .filter(|g| {
                g.subject.kind == SubjectKind::Group
                    && live_group_ids.contains(&g.subject.id)
                    && g.deleted_at.is_none()
            })
            .map(|g| self.0.detail_for(g))
            .collect())
    }

    async fn soft_delete(&self, id: GrantId, deleted_by: StaffId) -> Result<Grant> {
        let mut grants = self.0.grants.lock().unwrap();
        match grants
            .iter_mut()
            .find(|g| g.id == id && g.deleted_at.is_none())
        {
            Some(grant) => {
                grant.deleted_at = Some(Utc::now());
                grant.deleted_by_id = Some(deleted_by);
                Ok(grant.clone())
            }
            None => Err(KontorError::not_found("grant")),
        }
    }

    async fn get_list(
        &self,
        _kind: SubjectKind,
        _params: &ListParams,
    ) -> Result<ListResult<GrantDetail>> {
        unsupported()
    }
}
