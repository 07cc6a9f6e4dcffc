use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod access;
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod hashing;
pub mod models;
pub mod repository;
pub mod seed;

pub mod routes;
use auth::{AuthSysadmin, AuthUser};
use routes::{authenticated, pages, public, sysadmin};

// --- Public Re-exports ---

pub use access::VerifierState;
pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use hashing::{BcryptHasher, HasherState, MockHasher};
pub use repository::{InMemoryRepository, PostgresRepository, RepositoryState};

/// ApiDoc
///
/// OpenAPI document for the JSON API, served at `/api/docs/openapi.json`.
/// The docs live under `/api` so the access gate lets them through unchanged.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::login, handlers::logout, handlers::get_me, handlers::change_password,
        handlers::register_user, handlers::get_user_by_username,
        handlers::sysadmin_login, handlers::sysadmin_logout, handlers::sysadmin_me,
        handlers::list_users, handlers::create_user, handlers::get_user,
        handlers::update_user, handlers::delete_user,
        handlers::list_workouts, handlers::create_workout, handlers::get_workout,
        handlers::update_workout, handlers::delete_workout
    ),
    components(
        schemas(
            models::UserRecord, models::SysadminRecord, models::LoginRequest,
            models::LoginResponse, models::SysadminLoginResponse, models::SysadminMeResponse,
            models::CreateUserRequest, models::UpdateUserRequest, models::ChangePasswordRequest,
            models::MessageResponse, models::WorkoutLog, models::WorkoutInput,
            models::Exercise, models::WorkoutSet, models::DeleteWorkoutResponse,
        )
    ),
    tags(
        (name = "personal-hub", description = "Personal Hub API")
    )
)]
struct ApiDoc;

/// AppState
///
/// Everything a request may need, cloned cheaply into each handler. Handlers
/// and extractors pull the piece they need through `FromRef`.
#[derive(Clone)]
pub struct AppState {
    pub repo: RepositoryState,
    pub hasher: HasherState,
    /// Issues and verifies session tokens for both roles.
    pub verifier: VerifierState,
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for HasherState {
    fn from_ref(app_state: &AppState) -> HasherState {
        app_state.hasher.clone()
    }
}

impl FromRef<AppState> for VerifierState {
    fn from_ref(app_state: &AppState) -> VerifierState {
        app_state.verifier.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// require_user
///
/// Route layer for the authenticated group: the `AuthUser` extractor rejects
/// with 401 before the handler runs. The resolved user is cached on the
/// request, so the handler's own `AuthUser` costs nothing extra.
async fn require_user(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// require_sysadmin
///
/// Same as `require_user` for the sysadmin group.
async fn require_sysadmin(_admin: AuthSysadmin, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles pages and API, wraps everything in the access gate, then adds
/// the observability layers.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. API assembly, mounted under /api
    let api = Router::new()
        .merge(public::public_routes())
        .merge(
            authenticated::authenticated_routes()
                .route_layer(middleware::from_fn_with_state(state.clone(), require_user)),
        )
        .nest(
            "/sysadmin",
            sysadmin::sysadmin_routes()
                .route_layer(middleware::from_fn_with_state(state.clone(), require_sysadmin)),
        );

    // 3. Base Router Assembly
    // The gate wraps every route and the fallback, so it runs before any
    // handler, page or API.
    let base_router = Router::new()
        .merge(SwaggerUi::new("/api/docs").url("/api/docs/openapi.json", ApiDoc::openapi()))
        .nest("/api", api)
        .merge(pages::page_routes())
        .fallback(pages::not_found)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            access::access_gate,
        ))
        .with_state(state);

    // 4. Observability and Correlation Layers
    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Span per request carrying method, URI and the `x-request-id`, so every log
/// line of one request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
