//! Access resolution engine
//!
//! Answers whether a staff member may perform an action type on a resource
//! kind. Resolution aggregates the staff's direct grants with every grant
//! inherited through group membership; a root staff member bypasses the
//! check entirely. Results are resolved per call - call volume is bounded by
//! admin-action frequency, so correctness wins over caching.

use std::sync::Arc;

use tracing::{debug, instrument};

use kontor_core::{GrantDetail, GrantStore, Result, StaffId, StaffRepository, SubjectRef};

/// Whether any grant in the combined list covers (resource, action).
///
/// The comparison is by permission resource/action name only; a grant's
/// `is_allowed_all`/`allow_ids` scoping is not consulted at this gate (see
/// the record-scoping filter for the per-query concern).
pub fn grants_allow(grants: &[GrantDetail], resource: &str, action: &str) -> bool {
    if grants.is_empty() {
        return false;
    }
    grants.iter().any(|grant| grant.matches(resource, action))
}

/// Per-request access decisions over the grant store.
pub struct AccessResolver {
    staff: Arc<dyn StaffRepository>,
    grants: Arc<dyn GrantStore>,
}

impl AccessResolver {
    pub fn new(staff: Arc<dyn StaffRepository>, grants: Arc<dyn GrantStore>) -> Self {
        Self { staff, grants }
    }

    /// Decide allow/deny for (staff, resource, action).
    ///
    /// Fails NotFound when the staff member does not exist or is deleted.
    #[instrument(skip(self))]
    pub async fn can_access(
        &self,
        staff_id: StaffId,
        resource: &str,
        action: &str,
    ) -> Result<bool> {
        let staff = self.staff.validate_exists(staff_id).await?;
        if staff.is_root {
            debug!(%staff_id, "root staff, bypassing access check");
            return Ok(true);
        }

        let mut combined = self.grants.list_by_subject(SubjectRef::staff(staff_id)).await?;
        let inherited = self.grants.list_inherited_by_staff(staff_id).await?;
        combined.extend(inherited);

        let allowed = grants_allow(&combined, resource, action);
        debug!(
            %staff_id,
            resource,
            action,
            grants = combined.len(),
            allowed,
            "access resolved"
        );
        Ok(allowed)
    }
}

impl std::fmt::Debug for AccessResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessResolver").finish()
    }
}
