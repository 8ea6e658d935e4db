//! API route definitions

use axum::{
    middleware::from_fn_with_state,
    routing::{delete, get, post, put},
    Router,
};

use crate::handlers;
use crate::middleware::auth_middleware;
use crate::state::AppState;

/// Create the full API router with application state
pub fn create_router_with_state(state: AppState) -> Router {
    let protected = Router::new()
        .nest("/staff", staff_routes())
        .nest("/staff-positions", position_routes())
        .nest("/staff-departments", department_routes())
        .nest("/groups", group_routes())
        .nest("/permissions", permission_routes())
        .nest("/staff-permissions", staff_permission_routes())
        .nest("/group-permissions", group_permission_routes())
        .nest("/staff-groups", staff_group_routes())
        .nest("/ads-languages", language_routes())
        .route_layer(from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        // Health endpoints
        .route("/health", get(handlers::health_check))
        .route("/health/live", get(handlers::liveness))
        .route("/health/ready", get(handlers::readiness))
        // Login is the only unauthenticated API route
        .route("/api/v1/auth/login", post(handlers::auth::login))
        .nest("/api/v1", protected)
        .with_state(state)
}

fn staff_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::staff::create_staff))
        .route("/", get(handlers::staff::list_staff))
        .route("/{id}", get(handlers::staff::get_staff))
        .route("/{id}", put(handlers::staff::update_staff))
        .route("/{id}", delete(handlers::staff::delete_staff))
}

fn position_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::positions::create_position))
        .route("/", get(handlers::positions::list_positions))
        .route("/{id}", get(handlers::positions::get_position))
        .route("/{id}", put(handlers::positions::update_position))
        .route("/{id}", delete(handlers::positions::delete_position))
}

fn department_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::departments::create_department))
        .route("/", get(handlers::departments::list_departments))
        .route("/{id}", get(handlers::departments::get_department))
        .route("/{id}", put(handlers::departments::update_department))
        .route("/{id}", delete(handlers::departments::delete_department))
}

fn group_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::groups::create_group))
        .route("/", get(handlers::groups::list_groups))
        .route("/{id}", get(handlers::groups::get_group))
        .route("/{id}", put(handlers::groups::update_group))
        .route("/{id}", delete(handlers::groups::delete_group))
}

fn permission_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::permissions::list_permissions))
        .route("/{id}", get(handlers::permissions::get_permission))
}

fn staff_permission_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::staff_permissions::assign))
        .route("/bulk", post(handlers::staff_permissions::assign_many))
        .route("/", get(handlers::staff_permissions::get_list))
        .route(
            "/by/{staff_id}",
            get(handlers::staff_permissions::get_list_by_staff),
        )
        .route("/{id}", delete(handlers::staff_permissions::delete))
}

fn group_permission_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::group_permissions::assign))
        .route("/bulk", post(handlers::group_permissions::assign_many))
        .route("/", get(handlers::group_permissions::get_list))
        .route(
            "/by/{group_id}",
            get(handlers::group_permissions::get_list_by_group),
        )
        .route(
            "/by-staff/{staff_id}",
            get(handlers::group_permissions::get_list_by_staff),
        )
        .route("/{id}", delete(handlers::group_permissions::delete))
}

fn staff_group_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::staff_groups::assign))
        .route("/", get(handlers::staff_groups::get_list))
        .route(
            "/by/{staff_id}",
            get(handlers::staff_groups::get_list_by_staff),
        )
        .route("/{id}", delete(handlers::staff_groups::delete))
}

fn language_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::languages::create_language))
        .route("/", get(handlers::languages::list_languages))
        .route("/{id}", get(handlers::languages::get_language))
        .route("/{id}", put(handlers::languages::update_language))
        .route("/{id}", delete(handlers::languages::delete_language))
}
