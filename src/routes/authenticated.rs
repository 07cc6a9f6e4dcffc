use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Authenticated Router Module
///
/// Routes for a signed-in regular user. The `AuthUser` layer in `lib.rs`
/// rejects the request before any handler runs; handlers then scope every
/// workout query to that user.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        .route("/auth/me", get(handlers::get_me))
        .route("/auth/change-password", post(handlers::change_password))
        // --- Gym log ---
        .route(
            "/gym-log/workouts",
            get(handlers::list_workouts).post(handlers::create_workout),
        )
        // Another user's workout answers 404, never 403.
        .route(
            "/gym-log/workouts/{id}",
            get(handlers::get_workout)
                .put(handlers::update_workout)
                .delete(handlers::delete_workout),
        )
}
