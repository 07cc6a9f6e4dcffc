use personal_hub::{
    BcryptHasher,
    config::AppConfig,
    repository::PostgresRepository,
    seed::{self, SeedPlan},
};
use sqlx::postgres::PgPoolOptions;

/// seed
///
/// Applies migrations and provisions the root sysadmin and an optional sample
/// user from the environment. Safe to re-run.
#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "personal_hub=info".into()),
        )
        .init();

    let config = AppConfig::load();
    let plan = SeedPlan::from_env();
    if plan.sysadmin.is_none() {
        tracing::warn!("SYSADMIN_USERNAME/SYSADMIN_PASSWORD not set, no sysadmin will be created");
    }

    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&config.db_url)
        .await
        .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL.");

    let repo = PostgresRepository::new(pool);
    repo.migrate()
        .await
        .expect("FATAL: Failed to apply database migrations.");

    match seed::run(&repo, &BcryptHasher::default(), &plan).await {
        Ok(report) => tracing::info!(?report, "seeding finished"),
        Err(e) => {
            tracing::error!(error = %e, "seeding failed");
            std::process::exit(1);
        }
    }
}
