use personal_hub::{
    AppState, BcryptHasher, HasherState,
    access::credentials::verifier_from_config,
    config::{AppConfig, Env, SessionMode},
    create_router,
    repository::{PostgresRepository, RepositoryState},
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Loads configuration, sets up logging, connects and migrates Postgres, then
/// serves the gated router.
#[tokio::main]
async fn main() {
    // 1. Configuration (fail-fast on missing production secrets)
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging: RUST_LOG wins, otherwise sensible local defaults.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "personal_hub=debug,tower_http=info,axum=trace".into());

    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!(
        "Application starting in {:?} mode, {:?} sessions",
        config.env,
        config.session_mode
    );
    if config.env == Env::Production && config.session_mode == SessionMode::Static {
        tracing::warn!("Static session tokens are enabled in production; set SESSION_MODE=signed");
    }

    // 3. Database
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.db_url)
        .await
        .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL.");

    let postgres = PostgresRepository::new(pool);
    postgres
        .migrate()
        .await
        .expect("FATAL: Failed to apply database migrations.");
    let repo = Arc::new(postgres) as RepositoryState;

    // 4. Credentials
    let hasher = Arc::new(BcryptHasher::default()) as HasherState;
    let verifier = verifier_from_config(&config);

    // 5. Unified State Assembly
    let bind_addr = config.bind_addr.clone();
    let app_state = AppState {
        repo,
        hasher,
        verifier,
        config,
    };

    // 6. Router and Server Startup
    let app = create_router(app_state);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .expect("FATAL: Failed to bind BIND_ADDR.");

    tracing::info!("Listening on {bind_addr}");
    tracing::info!("API Documentation (Swagger UI) available at: http://{bind_addr}/api/docs");

    axum::serve(listener, app)
        .await
        .expect("FATAL: HTTP server terminated unexpectedly.");
}
