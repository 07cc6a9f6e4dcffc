use personal_hub::{
    AppError,
    models::{NewUser, UserUpdate, WorkoutInput},
    repository::{InMemoryRepository, PostgresRepository, Repository},
};
use sqlx::PgPool;
use tokio::test;
use uuid::Uuid;

// --- Test Context and Setup ---

/// Postgres-backed context; needs `DATABASE_URL` to point at a scratch database.
struct DbTestContext {
    pool: PgPool,
}

impl DbTestContext {
    async fn setup() -> Self {
        dotenv::dotenv().ok();

        let db_url = std::env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set to run integration tests");

        let pool = PgPool::connect(&db_url)
            .await
            .expect("Failed to connect to database for integration tests.");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run database migrations.");

        DbTestContext { pool }
    }

    fn repository(&self) -> PostgresRepository {
        PostgresRepository::new(self.pool.clone())
    }
}

// --- Shared contract ---

/// Unique names so repeated runs against one database do not collide.
fn unique(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4().simple())
}

fn new_user(username: &str, email: Option<&str>) -> NewUser {
    NewUser {
        username: username.into(),
        email: email.map(str::to_string),
        password_hash: "hash".into(),
    }
}

fn workout(id: &str, date: &str, day: &str) -> WorkoutInput {
    WorkoutInput {
        id: id.into(),
        date: date.into(),
        day: day.into(),
        exercises: vec![],
    }
}

async fn user_contract(repo: &dyn Repository) {
    let name = unique("ana");
    let email = format!("{name}@example.com");
    let ana = repo.create_user(new_user(&name, Some(&email))).await.unwrap();

    let dup_name = repo.create_user(new_user(&name, None)).await;
    assert!(matches!(dup_name, Err(AppError::Conflict(m)) if m == "Username already exists"));
    let dup_email = repo.create_user(new_user(&unique("bob"), Some(&email))).await;
    assert!(matches!(dup_email, Err(AppError::Conflict(m)) if m == "Email already exists"));

    // Users without email never collide with each other.
    repo.create_user(new_user(&unique("x"), None)).await.unwrap();
    repo.create_user(new_user(&unique("y"), Some("  "))).await.unwrap();

    assert_eq!(repo.find_user_by_username(&name).await.unwrap().unwrap().id, ana.id);
    assert_eq!(repo.find_user_by_email(&email).await.unwrap().unwrap().id, ana.id);

    let renamed = unique("anna");
    let updated = repo
        .update_user(
            ana.id,
            UserUpdate {
                username: Some(renamed.clone()),
                email: None,
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.username, renamed);
    assert_eq!(updated.email.as_deref(), Some(email.as_str()));

    let cleared = repo
        .update_user(
            ana.id,
            UserUpdate {
                username: None,
                email: Some(String::new()),
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(cleared.email, None);

    assert!(repo.set_user_password(ana.id, "new-hash".into()).await.unwrap());
    assert_eq!(repo.find_user(ana.id).await.unwrap().unwrap().password_hash, "new-hash");
    assert!(!repo.set_user_password(Uuid::new_v4(), "x".into()).await.unwrap());
    assert!(repo.update_user(Uuid::new_v4(), UserUpdate::default()).await.unwrap().is_none());

    assert!(repo.delete_user(ana.id).await.unwrap());
    assert!(!repo.delete_user(ana.id).await.unwrap());
    assert!(repo.find_user(ana.id).await.unwrap().is_none());
}

async fn sysadmin_contract(repo: &dyn Repository) {
    let name = unique("root");
    let admin = repo.create_sysadmin(&name, "hash".into()).await.unwrap();
    assert!(matches!(
        repo.create_sysadmin(&name, "hash".into()).await,
        Err(AppError::Conflict(_))
    ));
    assert_eq!(repo.find_sysadmin(admin.id).await.unwrap().unwrap().username, name);
    assert_eq!(repo.find_sysadmin_by_username(&name).await.unwrap().unwrap().id, admin.id);
    // Sysadmins are not users.
    assert!(repo.find_user(admin.id).await.unwrap().is_none());
}

async fn workout_contract(repo: &dyn Repository) {
    let ana = repo.create_user(new_user(&unique("ana"), None)).await.unwrap();
    let ben = repo.create_user(new_user(&unique("ben"), None)).await.unwrap();
    let w1 = unique("w");
    let w2 = unique("w");

    repo.create_workout(ana.id, workout(&w1, "2025-01-05", "Push")).await.unwrap();
    repo.create_workout(ana.id, workout(&w2, "2025-02-01", "Pull")).await.unwrap();
    let generated = repo.create_workout(ben.id, workout("", "2025-01-01", "Legs")).await.unwrap();
    assert!(!generated.id.is_empty());

    let listed = repo.list_workouts(ana.id).await.unwrap();
    let ids: Vec<&str> = listed.iter().map(|w| w.id.as_str()).collect();
    assert_eq!(ids, [w2.as_str(), w1.as_str()]);

    // Other users see nothing and can change nothing.
    assert!(repo.get_workout(&w1, ben.id).await.unwrap().is_none());
    assert!(repo
        .update_workout(&w1, ben.id, workout("", "2025-01-09", "Hijack"))
        .await
        .unwrap()
        .is_none());
    assert!(!repo.delete_workout(&w1, ben.id).await.unwrap());

    let updated = repo
        .update_workout(&w1, ana.id, workout("", "2025-01-06", "Push B"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.day, "Push B");
    assert_eq!(updated.user_id, ana.id);

    assert!(repo.delete_workout(&w1, ana.id).await.unwrap());
    assert!(repo.get_workout(&w1, ana.id).await.unwrap().is_none());

    // Deleting the owner takes their workouts along.
    repo.delete_user(ana.id).await.unwrap();
    assert!(repo.list_workouts(ana.id).await.unwrap().is_empty());
}

// --- In-memory ---

#[test]
async fn test_in_memory_users() {
    user_contract(&InMemoryRepository::new()).await;
}

#[test]
async fn test_in_memory_sysadmins() {
    sysadmin_contract(&InMemoryRepository::new()).await;
}

#[test]
async fn test_in_memory_workouts() {
    workout_contract(&InMemoryRepository::new()).await;
}

#[test]
async fn test_in_memory_list_users_newest_first() {
    let repo = InMemoryRepository::new();
    let first = repo.create_user(new_user("first", None)).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let second = repo.create_user(new_user("second", None)).await.unwrap();

    let ids: Vec<Uuid> = repo.list_users().await.unwrap().iter().map(|u| u.id).collect();
    assert_eq!(ids, [second.id, first.id]);
}

// --- Postgres ---

#[test]
#[ignore = "needs DATABASE_URL pointing at a Postgres instance"]
async fn test_postgres_users() {
    let ctx = DbTestContext::setup().await;
    user_contract(&ctx.repository()).await;
}

#[test]
#[ignore = "needs DATABASE_URL pointing at a Postgres instance"]
async fn test_postgres_sysadmins() {
    let ctx = DbTestContext::setup().await;
    sysadmin_contract(&ctx.repository()).await;
}

#[test]
#[ignore = "needs DATABASE_URL pointing at a Postgres instance"]
async fn test_postgres_workouts() {
    let ctx = DbTestContext::setup().await;
    workout_contract(&ctx.repository()).await;
}
