//! Allow-ids validator registry
//!
//! When a scoped grant is assigned, its `allow_ids` must reference existing
//! records of the permission's resource. Resources are data-seeded strings,
//! so the dispatch from resource name to existence check is a runtime map
//! populated at startup rather than a compile-time enum.
//!
//! Unknown resource names fall through without validation. This mirrors the
//! platform's historical behavior and is documented permissiveness, NOT a
//! security control: the access gate on the action itself remains the
//! authorization boundary.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use kontor_core::{RecordExistence, Result};

/// Maps resource names to the existence-check capability of their store.
#[derive(Default)]
pub struct AllowIdsRegistry {
    validators: HashMap<String, Arc<dyn RecordExistence>>,
}

impl AllowIdsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the validator for a resource name, replacing any previous one.
    pub fn register(&mut self, resource_name: impl Into<String>, validator: Arc<dyn RecordExistence>) {
        self.validators.insert(resource_name.into(), validator);
    }

    pub fn contains(&self, resource_name: &str) -> bool {
        self.validators.contains_key(resource_name)
    }

    /// Validate that every id exists for the named resource. Resources with
    /// no registered validator pass unchecked.
    pub async fn validate(&self, resource_name: &str, ids: &[Uuid]) -> Result<()> {
        match self.validators.get(resource_name) {
            Some(validator) => validator.validate_ids_exist(ids).await,
            None => {
                debug!(resource = resource_name, "no allow-ids validator registered, skipping");
                Ok(())
            }
        }
    }
}

impl std::fmt::Debug for AllowIdsRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&str> = self.validators.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("AllowIdsRegistry")
            .field("resources", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use kontor_core::KontorError;

    struct AlwaysMissing;

    #[async_trait]
    impl RecordExistence for AlwaysMissing {
        async fn validate_ids_exist(&self, _ids: &[Uuid]) -> Result<()> {
            Err(KontorError::not_found("one or more records"))
        }
    }

    struct AlwaysPresent;

    #[async_trait]
    impl RecordExistence for AlwaysPresent {
        async fn validate_ids_exist(&self, _ids: &[Uuid]) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_registered_validator_is_dispatched() {
        let mut registry = AllowIdsRegistry::new();
        registry.register("staff", Arc::new(AlwaysMissing));
        registry.register("group", Arc::new(AlwaysPresent));

        let ids = [Uuid::now_v7()];
        assert!(registry.validate("staff", &ids).await.is_err());
        assert!(registry.validate("group", &ids).await.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_resource_is_permissive() {
        let registry = AllowIdsRegistry::new();
        let ids = [Uuid::now_v7()];
        assert!(registry.validate("ads-tone", &ids).await.is_ok());
    }
}
