//! Engine unit tests over the in-memory fakes

use std::sync::Arc;

use uuid::Uuid;

use kontor_core::{GrantAssignment, KontorError, StaffId, SubjectKind, SubjectRef};

use crate::assignment::GrantAssignmentEngine;
use crate::cascade::{ImpliedGrantPolicy, NoCascade};
use crate::registry::AllowIdsRegistry;
use crate::resolver::AccessResolver;
use crate::testutil::*;

struct Harness {
    world: Arc<FakeWorld>,
    engine: GrantAssignmentEngine,
    resolver: AccessResolver,
    actor: StaffId,
}

fn harness_with(registry: AllowIdsRegistry, cascade: bool) -> Harness {
    let world = FakeWorld::new();
    let staff = Arc::new(FakeStaffRepo(world.clone()));
    let groups = Arc::new(FakeGroupRepo(world.clone()));
    let catalog = Arc::new(FakeCatalog(world.clone()));
    let grants = Arc::new(FakeGrantStore(world.clone()));

    let cascade: Arc<dyn crate::cascade::CascadePolicy> = if cascade {
        Arc::new(ImpliedGrantPolicy)
    } else {
        Arc::new(NoCascade)
    };

    let engine = GrantAssignmentEngine::new(
        staff.clone(),
        groups,
        catalog,
        grants.clone(),
        Arc::new(registry),
        cascade,
    );
    let resolver = AccessResolver::new(staff, grants);
    let actor = world.add_staff(false);

    Harness {
        world,
        engine,
        resolver,
        actor,
    }
}

fn harness() -> Harness {
    harness_with(AllowIdsRegistry::new(), false)
}

fn allow_all(permission_id: kontor_core::PermissionId, actor: StaffId) -> GrantAssignment {
    GrantAssignment {
        permission_id,
        is_allowed_all: true,
        allow_ids: vec![],
        actor_id: actor,
    }
}

// =============================================================================
// Access Resolution
// =============================================================================

#[tokio::test]
async fn test_root_bypass_with_zero_grants() {
    let h = harness();
    let root = h.world.add_staff(true);

    for (resource, action) in [
        ("staff", "create"),
        ("group", "delete"),
        ("ads-language", "edit"),
    ] {
        assert!(h.resolver.can_access(root, resource, action).await.unwrap());
    }
}

#[tokio::test]
async fn test_no_grants_denies_everything() {
    let h = harness();
    let staff = h.world.add_staff(false);

    assert!(!h.resolver.can_access(staff, "staff", "read").await.unwrap());
    assert!(!h.resolver.can_access(staff, "group", "edit").await.unwrap());
}

#[tokio::test]
async fn test_missing_staff_fails_not_found() {
    let h = harness();
    let err = h
        .resolver
        .can_access(StaffId::new(), "staff", "read")
        .await
        .unwrap_err();
    assert!(matches!(err, KontorError::NotFound { .. }));
}

#[tokio::test]
async fn test_direct_grant_covers_exact_pair_only() {
    let h = harness();
    let staff = h.world.add_staff(false);
    let edit_group = h.world.add_permission("group", "edit");

    h.engine
        .assign(SubjectRef::staff(staff), allow_all(edit_group, h.actor))
        .await
        .unwrap();

    assert!(h.resolver.can_access(staff, "group", "edit").await.unwrap());
    assert!(!h.resolver.can_access(staff, "group", "delete").await.unwrap());
    assert!(!h.resolver.can_access(staff, "staff", "edit").await.unwrap());
}

#[tokio::test]
async fn test_scoped_grant_still_passes_action_gate() {
    let h = harness();
    let staff = h.world.add_staff(false);
    let other = h.world.add_staff(false);
    let edit_staff = h.world.add_permission("staff", "edit");

    h.engine
        .assign(
            SubjectRef::staff(staff),
            GrantAssignment {
                permission_id: edit_staff,
                is_allowed_all: false,
                allow_ids: vec![*other.as_uuid()],
                actor_id: h.actor,
            },
        )
        .await
        .unwrap();

    // Which records are editable is a list-layer concern; the gate only
    // answers whether the action type is allowed at all.
    assert!(h.resolver.can_access(staff, "staff", "edit").await.unwrap());
}

#[tokio::test]
async fn test_group_inheritance_follows_membership() {
    let h = harness();
    let staff = h.world.add_staff(false);
    let group = h.world.add_group();
    let read_staff = h.world.add_permission("staff", "read");

    h.engine
        .assign(SubjectRef::group(group), allow_all(read_staff, h.actor))
        .await
        .unwrap();

    assert!(!h.resolver.can_access(staff, "staff", "read").await.unwrap());

    h.world.add_membership(staff, group);
    assert!(h.resolver.can_access(staff, "staff", "read").await.unwrap());

    h.world.remove_membership(staff, group);
    assert!(!h.resolver.can_access(staff, "staff", "read").await.unwrap());
}

#[tokio::test]
async fn test_tombstoned_group_stops_contributing_grants() {
    let h = harness();
    let staff = h.world.add_staff(false);
    let group = h.world.add_group();
    let read_staff = h.world.add_permission("staff", "read");

    h.engine
        .assign(SubjectRef::group(group), allow_all(read_staff, h.actor))
        .await
        .unwrap();
    h.world.add_membership(staff, group);
    assert!(h.resolver.can_access(staff, "staff", "read").await.unwrap());

    h.world.tombstone_group(group);
    assert!(!h.resolver.can_access(staff, "staff", "read").await.unwrap());
}

// =============================================================================
// Grant Assignment
// =============================================================================

#[tokio::test]
async fn test_assign_upsert_is_idempotent() {
    let h = harness();
    let staff = h.world.add_staff(false);
    let target_a = Uuid::now_v7();
    let target_b = Uuid::now_v7();
    let permission = h.world.add_permission("ads-language", "edit");

    h.engine
        .assign(
            SubjectRef::staff(staff),
            GrantAssignment {
                permission_id: permission,
                is_allowed_all: false,
                allow_ids: vec![target_a],
                actor_id: h.actor,
            },
        )
        .await
        .unwrap();

    let updated = h
        .engine
        .assign(
            SubjectRef::staff(staff),
            GrantAssignment {
                permission_id: permission,
                is_allowed_all: false,
                allow_ids: vec![target_b],
                actor_id: h.actor,
            },
        )
        .await
        .unwrap();

    let live = h.world.live_grants();
    assert_eq!(live.len(), 1, "upsert must never append a second row");
    assert_eq!(live[0].allow_ids, vec![target_b]);
    assert_eq!(updated.allow_ids, vec![target_b]);
}

#[tokio::test]
async fn test_assign_rejects_missing_subject_actor_and_permission() {
    let h = harness();
    let staff = h.world.add_staff(false);
    let permission = h.world.add_permission("staff", "read");

    // Missing subject
    let err = h
        .engine
        .assign(SubjectRef::staff(StaffId::new()), allow_all(permission, h.actor))
        .await
        .unwrap_err();
    assert!(matches!(err, KontorError::NotFound { .. }));

    // Missing actor
    let err = h
        .engine
        .assign(SubjectRef::staff(staff), allow_all(permission, StaffId::new()))
        .await
        .unwrap_err();
    assert!(matches!(err, KontorError::NotFound { .. }));

    // Missing permission
    let err = h
        .engine
        .assign(
            SubjectRef::staff(staff),
            allow_all(kontor_core::PermissionId::new(), h.actor),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, KontorError::NotFound { .. }));

    assert!(h.world.live_grants().is_empty());
}

#[tokio::test]
async fn test_scoped_allow_ids_validated_against_resource() {
    let world = FakeWorld::new();
    let mut registry = AllowIdsRegistry::new();
    registry.register("staff", Arc::new(FakeStaffRepo(world.clone())));

    let staff = Arc::new(FakeStaffRepo(world.clone()));
    let groups = Arc::new(FakeGroupRepo(world.clone()));
    let catalog = Arc::new(FakeCatalog(world.clone()));
    let grants = Arc::new(FakeGrantStore(world.clone()));
    let engine = GrantAssignmentEngine::new(
        staff,
        groups,
        catalog,
        grants,
        Arc::new(registry),
        Arc::new(NoCascade),
    );

    let actor = world.add_staff(false);
    let subject = world.add_staff(false);
    let known = world.add_staff(false);
    let permission = world.add_permission("staff", "edit");

    // One bogus id in the allow list fails the whole assignment
    let err = engine
        .assign(
            SubjectRef::staff(subject),
            GrantAssignment {
                permission_id: permission,
                is_allowed_all: false,
                allow_ids: vec![*known.as_uuid(), Uuid::now_v7()],
                actor_id: actor,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, KontorError::NotFound { .. }));
    assert!(world.live_grants().is_empty(), "no grant may be written");

    // All-known ids pass
    engine
        .assign(
            SubjectRef::staff(subject),
            GrantAssignment {
                permission_id: permission,
                is_allowed_all: false,
                allow_ids: vec![*known.as_uuid()],
                actor_id: actor,
            },
        )
        .await
        .unwrap();
    assert_eq!(world.live_grants().len(), 1);
}

#[tokio::test]
async fn test_unrecognized_resource_skips_allow_ids_validation() {
    let h = harness();
    let staff = h.world.add_staff(false);
    let permission = h.world.add_permission("ads-tone", "edit");

    // No validator registered for "ads-tone": the scoped list passes through
    h.engine
        .assign(
            SubjectRef::staff(staff),
            GrantAssignment {
                permission_id: permission,
                is_allowed_all: false,
                allow_ids: vec![Uuid::now_v7()],
                actor_id: h.actor,
            },
        )
        .await
        .unwrap();
    assert_eq!(h.world.live_grants().len(), 1);
}

#[tokio::test]
async fn test_wildcard_grant_skips_allow_ids_validation() {
    let world = FakeWorld::new();
    let mut registry = AllowIdsRegistry::new();
    registry.register("staff", Arc::new(FakeStaffRepo(world.clone())));

    let staff_repo = Arc::new(FakeStaffRepo(world.clone()));
    let engine = GrantAssignmentEngine::new(
        staff_repo,
        Arc::new(FakeGroupRepo(world.clone())),
        Arc::new(FakeCatalog(world.clone())),
        Arc::new(FakeGrantStore(world.clone())),
        Arc::new(registry),
        Arc::new(NoCascade),
    );

    let actor = world.add_staff(false);
    let subject = world.add_staff(false);
    let permission = world.add_permission("staff", "edit");

    // allow_ids are meaningless under is_allowed_all and must not be checked
    engine
        .assign(
            SubjectRef::staff(subject),
            GrantAssignment {
                permission_id: permission,
                is_allowed_all: true,
                allow_ids: vec![Uuid::now_v7()],
                actor_id: actor,
            },
        )
        .await
        .unwrap();
    assert_eq!(world.live_grants().len(), 1);
}

// =============================================================================
// Cascade
// =============================================================================

#[tokio::test]
async fn test_create_cascades_to_edit_and_read() {
    let h = harness_with(AllowIdsRegistry::new(), true);
    let staff = h.world.add_staff(false);
    let create = h.world.add_permission("ads-language", "create");
    let edit = h.world.add_permission("ads-language", "edit");
    let read = h.world.add_permission("ads-language", "read");

    h.engine
        .assign(SubjectRef::staff(staff), allow_all(create, h.actor))
        .await
        .unwrap();

    let live = h.world.live_grants();
    assert_eq!(live.len(), 3);
    let assigned: Vec<_> = live.iter().map(|g| g.permission_id).collect();
    assert!(assigned.contains(&create));
    assert!(assigned.contains(&edit));
    assert!(assigned.contains(&read));

    assert!(h.resolver.can_access(staff, "ads-language", "read").await.unwrap());
    assert!(h.resolver.can_access(staff, "ads-language", "edit").await.unwrap());
}

#[tokio::test]
async fn test_cascade_carries_the_same_scoping() {
    let h = harness_with(AllowIdsRegistry::new(), true);
    let staff = h.world.add_staff(false);
    let edit = h.world.add_permission("ads-language", "edit");
    let read = h.world.add_permission("ads-language", "read");
    let target = Uuid::now_v7();

    h.engine
        .assign(
            SubjectRef::staff(staff),
            GrantAssignment {
                permission_id: edit,
                is_allowed_all: false,
                allow_ids: vec![target],
                actor_id: h.actor,
            },
        )
        .await
        .unwrap();

    let live = h.world.live_grants();
    assert_eq!(live.len(), 2);
    for grant in &live {
        assert!(!grant.is_allowed_all);
        assert_eq!(grant.allow_ids, vec![target]);
    }
    assert!(live.iter().any(|g| g.permission_id == read));
}

#[tokio::test]
async fn test_cascade_skips_missing_catalog_entries() {
    let h = harness_with(AllowIdsRegistry::new(), true);
    let staff = h.world.add_staff(false);
    // Only "create" is seeded; the implied edit/read entries are absent
    let create = h.world.add_permission("ads-language", "create");

    h.engine
        .assign(SubjectRef::staff(staff), allow_all(create, h.actor))
        .await
        .unwrap();

    assert_eq!(h.world.live_grants().len(), 1);
}

#[tokio::test]
async fn test_cascade_does_not_duplicate_on_reassign() {
    let h = harness_with(AllowIdsRegistry::new(), true);
    let staff = h.world.add_staff(false);
    let create = h.world.add_permission("group", "create");
    h.world.add_permission("group", "edit");
    h.world.add_permission("group", "read");

    h.engine
        .assign(SubjectRef::staff(staff), allow_all(create, h.actor))
        .await
        .unwrap();
    h.engine
        .assign(SubjectRef::staff(staff), allow_all(create, h.actor))
        .await
        .unwrap();

    assert_eq!(h.world.live_grants().len(), 3);
}

// =============================================================================
// Bulk Assignment
// =============================================================================

#[tokio::test]
async fn test_assign_many_inserts_only_missing() {
    let h = harness();
    let staff = h.world.add_staff(false);
    let p1 = h.world.add_permission("staff", "read");
    let p2 = h.world.add_permission("group", "read");

    h.engine
        .assign(SubjectRef::staff(staff), allow_all(p1, h.actor))
        .await
        .unwrap();
    let first = h.world.live_grants();
    assert_eq!(first.len(), 1);
    let original_id = first[0].id;

    let result = h
        .engine
        .assign_many(SubjectRef::staff(staff), &[p1, p2], h.actor)
        .await
        .unwrap();

    assert_eq!(result.len(), 2);
    let live = h.world.live_grants();
    assert_eq!(live.len(), 2);
    // The pre-existing grant was left untouched
    assert!(live.iter().any(|g| g.id == original_id));
}

#[tokio::test]
async fn test_assign_many_is_atomic_on_missing_permission() {
    let h = harness();
    let staff = h.world.add_staff(false);
    let valid = h.world.add_permission("staff", "read");
    let invalid = kontor_core::PermissionId::new();

    let err = h
        .engine
        .assign_many(SubjectRef::staff(staff), &[valid, invalid], h.actor)
        .await
        .unwrap_err();
    assert!(matches!(err, KontorError::NotFound { .. }));
    assert!(h.world.live_grants().is_empty(), "no partial assignment");
}

#[tokio::test]
async fn test_assign_many_grants_are_allow_all() {
    let h = harness();
    let staff = h.world.add_staff(false);
    let p = h.world.add_permission("staff", "read");

    let result = h
        .engine
        .assign_many(SubjectRef::staff(staff), &[p], h.actor)
        .await
        .unwrap();

    assert_eq!(result.len(), 1);
    assert!(result[0].is_allowed_all);
    assert!(result[0].allow_ids.is_empty());
}

// =============================================================================
// Revocation & Listing
// =============================================================================

#[tokio::test]
async fn test_wildcard_grant_scenario_with_revoke() {
    let h = harness();
    let staff = h.world.add_staff(false);
    let edit_position = h.world.add_permission("staff-position", "edit");

    let granted = h
        .engine
        .assign(SubjectRef::staff(staff), allow_all(edit_position, h.actor))
        .await
        .unwrap();

    assert!(h
        .resolver
        .can_access(staff, "staff-position", "edit")
        .await
        .unwrap());
    assert!(!h
        .resolver
        .can_access(staff, "staff-position", "delete")
        .await
        .unwrap());

    h.engine
        .revoke(SubjectKind::Staff, granted.id, h.actor)
        .await
        .unwrap();
    assert!(!h
        .resolver
        .can_access(staff, "staff-position", "edit")
        .await
        .unwrap());
}

#[tokio::test]
async fn test_revoke_requires_matching_subject_kind() {
    let h = harness();
    let staff = h.world.add_staff(false);
    let p = h.world.add_permission("staff", "read");

    let granted = h
        .engine
        .assign(SubjectRef::staff(staff), allow_all(p, h.actor))
        .await
        .unwrap();

    // A staff-level grant is not addressable through the group-level surface
    let err = h
        .engine
        .revoke(SubjectKind::Group, granted.id, h.actor)
        .await
        .unwrap_err();
    assert!(matches!(err, KontorError::NotFound { .. }));

    h.engine
        .revoke(SubjectKind::Staff, granted.id, h.actor)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_revoked_grant_can_be_reassigned() {
    let h = harness();
    let staff = h.world.add_staff(false);
    let p = h.world.add_permission("staff", "read");

    let granted = h
        .engine
        .assign(SubjectRef::staff(staff), allow_all(p, h.actor))
        .await
        .unwrap();
    h.engine
        .revoke(SubjectKind::Staff, granted.id, h.actor)
        .await
        .unwrap();

    h.engine
        .assign(SubjectRef::staff(staff), allow_all(p, h.actor))
        .await
        .unwrap();
    assert_eq!(h.world.live_grants().len(), 1);
    assert!(h.resolver.can_access(staff, "staff", "read").await.unwrap());
}

#[tokio::test]
async fn test_list_by_staff_fails_for_missing_staff() {
    let h = harness();
    let err = h.engine.list_by_staff(StaffId::new()).await.unwrap_err();
    assert!(matches!(err, KontorError::NotFound { .. }));
}
