//! Application state for API handlers

use sqlx::PgPool;
use std::sync::Arc;

use kontor_access::{AccessResolver, AllowIdsRegistry, GrantAssignmentEngine, ImpliedGrantPolicy};
use kontor_db::repositories::{
    PgAdsLanguageRepository, PgGrantStore, PgGroupRepository, PgMembershipRegistry,
    PgPermissionCatalog, PgStaffDepartmentRepository, PgStaffPositionRepository,
    PgStaffRepository,
};

use crate::token::TokenService;

/// Concrete application state with all services
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub staff_repo: Arc<PgStaffRepository>,
    pub position_repo: Arc<PgStaffPositionRepository>,
    pub department_repo: Arc<PgStaffDepartmentRepository>,
    pub group_repo: Arc<PgGroupRepository>,
    pub language_repo: Arc<PgAdsLanguageRepository>,
    pub catalog: Arc<PgPermissionCatalog>,
    pub grant_store: Arc<PgGrantStore>,
    pub memberships: Arc<PgMembershipRegistry>,
    pub assignment: Arc<GrantAssignmentEngine>,
    pub resolver: Arc<AccessResolver>,
    pub token_service: Arc<TokenService>,
}

impl AppState {
    /// Wire repositories and engines over the shared pool. The allow-ids
    /// registry is seeded with every resource that has an existence check;
    /// resources added later by data seeding simply skip scoped-list
    /// validation until a validator is registered here.
    pub fn new(db_pool: PgPool, token_service: TokenService) -> Self {
        let staff_repo = Arc::new(PgStaffRepository::new(db_pool.clone()));
        let position_repo = Arc::new(PgStaffPositionRepository::new(db_pool.clone()));
        let department_repo = Arc::new(PgStaffDepartmentRepository::new(db_pool.clone()));
        let group_repo = Arc::new(PgGroupRepository::new(db_pool.clone()));
        let language_repo = Arc::new(PgAdsLanguageRepository::new(db_pool.clone()));
        let catalog = Arc::new(PgPermissionCatalog::new(db_pool.clone()));
        let grant_store = Arc::new(PgGrantStore::new(db_pool.clone()));
        let memberships = Arc::new(PgMembershipRegistry::new(db_pool.clone()));

        let mut registry = AllowIdsRegistry::new();
        registry.register("staff", staff_repo.clone());
        registry.register("staff-position", position_repo.clone());
        registry.register("staff-department", department_repo.clone());
        registry.register("group", group_repo.clone());
        registry.register("ads-language", language_repo.clone());

        let assignment = Arc::new(GrantAssignmentEngine::new(
            staff_repo.clone(),
            group_repo.clone(),
            catalog.clone(),
            grant_store.clone(),
            Arc::new(registry),
            Arc::new(ImpliedGrantPolicy),
        ));
        let resolver = Arc::new(AccessResolver::new(
            staff_repo.clone(),
            grant_store.clone(),
        ));

        Self {
            db_pool,
            staff_repo,
            position_repo,
            department_repo,
            group_repo,
            language_repo,
            catalog,
            grant_store,
            memberships,
            assignment,
            resolver,
            token_service: Arc::new(token_service),
        }
    }
}
