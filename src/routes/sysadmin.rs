use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Sysadmin Router Module
///
/// User management for the sysadmin console, nested under `/sysadmin`.
/// Guarded by the `AuthSysadmin` layer; a regular-user session is not enough.
pub fn sysadmin_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/users",
            get(handlers::list_users).post(handlers::create_user),
        )
        .route(
            "/users/{id}",
            get(handlers::get_user)
                .put(handlers::update_user)
                .delete(handlers::delete_user),
        )
}
