use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints that need no session. Sign-in endpoints live here for both
/// identity domains, and so do the logouts, which only clear cookies.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /api/health
        // Liveness probe for load balancers.
        .route("/health", get(|| async { "ok" }))
        // --- Regular users ---
        .route("/auth/login", post(handlers::login))
        .route("/auth/logout", post(handlers::logout))
        // POST registers, GET ?username= looks a user up.
        .route(
            "/users",
            post(handlers::register_user).get(handlers::get_user_by_username),
        )
        // --- Sysadmins ---
        .route("/sysadmin/auth/login", post(handlers::sysadmin_login))
        .route("/sysadmin/auth/logout", post(handlers::sysadmin_logout))
        // Answers 401 `Not authenticated` itself rather than through a layer.
        .route("/sysadmin/auth/me", get(handlers::sysadmin_me))
}
