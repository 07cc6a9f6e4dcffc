use crate::{
    error::{AppError, AppResult},
    models::{Exercise, NewUser, Sysadmin, User, UserUpdate, WorkoutInput, WorkoutLog, normalize_email},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, types::Json};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Repository Trait
///
/// The persistence contract: plain keyed CRUD over users, sysadmins and
/// workout documents. Ownership filtering for workouts is part of the
/// contract, every workout query takes the owner's id.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    /// Fails with `Conflict` when the username or email is taken.
    async fn create_user(&self, user: NewUser) -> AppResult<User>;
    async fn find_user(&self, id: Uuid) -> AppResult<Option<User>>;
    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>>;
    // Newest first.
    async fn list_users(&self) -> AppResult<Vec<User>>;
    // A blank email in the update clears the stored email.
    async fn update_user(&self, id: Uuid, update: UserUpdate) -> AppResult<Option<User>>;
    async fn set_user_password(&self, id: Uuid, password_hash: String) -> AppResult<bool>;
    async fn delete_user(&self, id: Uuid) -> AppResult<bool>;

    // --- Sysadmins ---
    async fn create_sysadmin(&self, username: &str, password_hash: String) -> AppResult<Sysadmin>;
    async fn find_sysadmin(&self, id: Uuid) -> AppResult<Option<Sysadmin>>;
    async fn find_sysadmin_by_username(&self, username: &str) -> AppResult<Option<Sysadmin>>;

    // --- Workouts (owner-scoped) ---
    // Sorted by date, newest first.
    async fn list_workouts(&self, user_id: Uuid) -> AppResult<Vec<WorkoutLog>>;
    async fn get_workout(&self, id: &str, user_id: Uuid) -> AppResult<Option<WorkoutLog>>;
    /// Generates an id when `input.id` is empty.
    async fn create_workout(&self, user_id: Uuid, input: WorkoutInput) -> AppResult<WorkoutLog>;
    async fn update_workout(
        &self,
        id: &str,
        user_id: Uuid,
        input: WorkoutInput,
    ) -> AppResult<Option<WorkoutLog>>;
    async fn delete_workout(&self, id: &str, user_id: Uuid) -> AppResult<bool>;
}

/// RepositoryState
///
/// Shared handle on the persistence layer.
pub type RepositoryState = Arc<dyn Repository>;

fn workout_id(input: &WorkoutInput) -> String {
    if input.id.trim().is_empty() {
        Uuid::new_v4().simple().to_string()
    } else {
        input.id.trim().to_string()
    }
}

/// Maps unique-constraint violations onto the 409 the API promises.
fn map_write_error(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            let message = match db.constraint().unwrap_or_default() {
                c if c.contains("email") => "Email already exists",
                c if c.contains("workout") => "Workout already exists",
                _ => "Username already exists",
            };
            return AppError::Conflict(message.to_string());
        }
    }
    AppError::Database(e)
}

/// PostgresRepository
///
/// `Repository` over Postgres. Workout exercises are stored as one JSONB
/// document per workout.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the embedded schema migrations.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

#[derive(FromRow)]
struct WorkoutRow {
    id: String,
    user_id: Uuid,
    date: String,
    day: String,
    exercises: Json<Vec<Exercise>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<WorkoutRow> for WorkoutLog {
    fn from(row: WorkoutRow) -> Self {
        WorkoutLog {
            id: row.id,
            user_id: row.user_id,
            date: row.date,
            day: row.day,
            exercises: row.exercises.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const USER_COLUMNS: &str = "id, username, email, password_hash, created_at, updated_at";
const SYSADMIN_COLUMNS: &str = "id, username, password_hash, created_at, updated_at";
const WORKOUT_COLUMNS: &str = "id, user_id, date, day, exercises, created_at, updated_at";

#[async_trait]
impl Repository for PostgresRepository {
    async fn create_user(&self, user: NewUser) -> AppResult<User> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (id, username, email, password_hash) \
             VALUES ($1, $2, $3, $4) RETURNING {USER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&user.username)
        .bind(normalize_email(user.email.as_deref()))
        .bind(&user.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)
    }

    async fn find_user(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(
            sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        Ok(sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        Ok(sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn list_users(&self) -> AppResult<Vec<User>> {
        Ok(sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?)
    }

    /// update_user
    ///
    /// COALESCE keeps untouched username; the email flag lets a blank email
    /// clear the column, which COALESCE alone cannot express.
    async fn update_user(&self, id: Uuid, update: UserUpdate) -> AppResult<Option<User>> {
        let touch_email = update.email.is_some();
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET \
                username = COALESCE($2, username), \
                email = CASE WHEN $4 THEN $3 ELSE email END, \
                updated_at = now() \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(update.username)
        .bind(normalize_email(update.email.as_deref()))
        .bind(touch_email)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_write_error)
    }

    async fn set_user_password(&self, id: Uuid, password_hash: String) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = $2, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_user(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_sysadmin(&self, username: &str, password_hash: String) -> AppResult<Sysadmin> {
        sqlx::query_as::<_, Sysadmin>(&format!(
            "INSERT INTO sysadmins (id, username, password_hash) \
             VALUES ($1, $2, $3) RETURNING {SYSADMIN_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(username)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)
    }

    async fn find_sysadmin(&self, id: Uuid) -> AppResult<Option<Sysadmin>> {
        Ok(sqlx::query_as::<_, Sysadmin>(&format!(
            "SELECT {SYSADMIN_COLUMNS} FROM sysadmins WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn find_sysadmin_by_username(&self, username: &str) -> AppResult<Option<Sysadmin>> {
        Ok(sqlx::query_as::<_, Sysadmin>(&format!(
            "SELECT {SYSADMIN_COLUMNS} FROM sysadmins WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn list_workouts(&self, user_id: Uuid) -> AppResult<Vec<WorkoutLog>> {
        let rows = sqlx::query_as::<_, WorkoutRow>(&format!(
            "SELECT {WORKOUT_COLUMNS} FROM workout_logs WHERE user_id = $1 ORDER BY date DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(WorkoutLog::from).collect())
    }

    async fn get_workout(&self, id: &str, user_id: Uuid) -> AppResult<Option<WorkoutLog>> {
        let row = sqlx::query_as::<_, WorkoutRow>(&format!(
            "SELECT {WORKOUT_COLUMNS} FROM workout_logs WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(WorkoutLog::from))
    }

    async fn create_workout(&self, user_id: Uuid, input: WorkoutInput) -> AppResult<WorkoutLog> {
        let row = sqlx::query_as::<_, WorkoutRow>(&format!(
            "INSERT INTO workout_logs (id, user_id, date, day, exercises) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {WORKOUT_COLUMNS}"
        ))
        .bind(workout_id(&input))
        .bind(user_id)
        .bind(&input.date)
        .bind(&input.day)
        .bind(Json(&input.exercises))
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)?;
        Ok(row.into())
    }

    /// update_workout
    ///
    /// Owner-only: the `user_id` predicate makes another user's workout
    /// indistinguishable from a missing one. The owner column is never written.
    async fn update_workout(
        &self,
        id: &str,
        user_id: Uuid,
        input: WorkoutInput,
    ) -> AppResult<Option<WorkoutLog>> {
        let row = sqlx::query_as::<_, WorkoutRow>(&format!(
            "UPDATE workout_logs SET date = $3, day = $4, exercises = $5, updated_at = now() \
             WHERE id = $1 AND user_id = $2 RETURNING {WORKOUT_COLUMNS}"
        ))
        .bind(id)
        .bind(user_id)
        .bind(&input.date)
        .bind(&input.day)
        .bind(Json(&input.exercises))
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(WorkoutLog::from))
    }

    async fn delete_workout(&self, id: &str, user_id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM workout_logs WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

// --- In-memory implementation ---

#[derive(Default)]
struct MemoryStore {
    users: HashMap<Uuid, User>,
    sysadmins: HashMap<Uuid, Sysadmin>,
    workouts: Vec<WorkoutLog>,
}

impl MemoryStore {
    fn username_taken(&self, username: &str, except: Option<Uuid>) -> bool {
        self.users
            .values()
            .any(|u| u.username == username && Some(u.id) != except)
    }

    fn email_taken(&self, email: &str, except: Option<Uuid>) -> bool {
        self.users
            .values()
            .any(|u| u.email.as_deref() == Some(email) && Some(u.id) != except)
    }
}

/// InMemoryRepository
///
/// A process-local `Repository` with the same uniqueness and ownership rules
/// as the Postgres schema. Used by the test suite and for running the server
/// without a database.
#[derive(Default)]
pub struct InMemoryRepository {
    store: RwLock<MemoryStore>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn create_user(&self, user: NewUser) -> AppResult<User> {
        let mut store = self.store.write().await;
        let email = normalize_email(user.email.as_deref());

        if store.username_taken(&user.username, None) {
            return Err(AppError::Conflict("Username already exists".into()));
        }
        if let Some(email) = &email {
            if store.email_taken(email, None) {
                return Err(AppError::Conflict("Email already exists".into()));
            }
        }

        let now = Utc::now();
        let created = User {
            id: Uuid::new_v4(),
            username: user.username,
            email,
            password_hash: user.password_hash,
            created_at: now,
            updated_at: now,
        };
        store.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_user(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.store.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let store = self.store.read().await;
        Ok(store.users.values().find(|u| u.username == username).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let store = self.store.read().await;
        Ok(store
            .users
            .values()
            .find(|u| u.email.as_deref() == Some(email))
            .cloned())
    }

    async fn list_users(&self) -> AppResult<Vec<User>> {
        let mut users: Vec<User> = self.store.read().await.users.values().cloned().collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users)
    }

    async fn update_user(&self, id: Uuid, update: UserUpdate) -> AppResult<Option<User>> {
        let mut store = self.store.write().await;
        if !store.users.contains_key(&id) {
            return Ok(None);
        }

        if let Some(username) = &update.username {
            if store.username_taken(username, Some(id)) {
                return Err(AppError::Conflict("Username already exists".into()));
            }
        }
        let email = normalize_email(update.email.as_deref());
        if let Some(email) = &email {
            if store.email_taken(email, Some(id)) {
                return Err(AppError::Conflict("Email already exists".into()));
            }
        }

        let Some(user) = store.users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(username) = update.username {
            user.username = username;
        }
        if update.email.is_some() {
            user.email = email;
        }
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn set_user_password(&self, id: Uuid, password_hash: String) -> AppResult<bool> {
        let mut store = self.store.write().await;
        Ok(match store.users.get_mut(&id) {
            Some(user) => {
                user.password_hash = password_hash;
                user.updated_at = Utc::now();
                true
            }
            None => false,
        })
    }

    async fn delete_user(&self, id: Uuid) -> AppResult<bool> {
        let mut store = self.store.write().await;
        let removed = store.users.remove(&id).is_some();
        if removed {
            store.workouts.retain(|w| w.user_id != id);
        }
        Ok(removed)
    }

    async fn create_sysadmin(&self, username: &str, password_hash: String) -> AppResult<Sysadmin> {
        let mut store = self.store.write().await;
        if store.sysadmins.values().any(|a| a.username == username) {
            return Err(AppError::Conflict("Username already exists".into()));
        }

        let now = Utc::now();
        let admin = Sysadmin {
            id: Uuid::new_v4(),
            username: username.to_string(),
            password_hash,
            created_at: now,
            updated_at: now,
        };
        store.sysadmins.insert(admin.id, admin.clone());
        Ok(admin)
    }

    async fn find_sysadmin(&self, id: Uuid) -> AppResult<Option<Sysadmin>> {
        Ok(self.store.read().await.sysadmins.get(&id).cloned())
    }

    async fn find_sysadmin_by_username(&self, username: &str) -> AppResult<Option<Sysadmin>> {
        let store = self.store.read().await;
        Ok(store
            .sysadmins
            .values()
            .find(|a| a.username == username)
            .cloned())
    }

    async fn list_workouts(&self, user_id: Uuid) -> AppResult<Vec<WorkoutLog>> {
        let mut workouts: Vec<WorkoutLog> = self
            .store
            .read()
            .await
            .workouts
            .iter()
            .filter(|w| w.user_id == user_id)
            .cloned()
            .collect();
        workouts.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(workouts)
    }

    async fn get_workout(&self, id: &str, user_id: Uuid) -> AppResult<Option<WorkoutLog>> {
        let store = self.store.read().await;
        Ok(store
            .workouts
            .iter()
            .find(|w| w.id == id && w.user_id == user_id)
            .cloned())
    }

    async fn create_workout(&self, user_id: Uuid, input: WorkoutInput) -> AppResult<WorkoutLog> {
        let mut store = self.store.write().await;
        let id = workout_id(&input);
        if store.workouts.iter().any(|w| w.id == id) {
            return Err(AppError::Conflict("Workout already exists".into()));
        }

        let now = Utc::now();
        let workout = WorkoutLog {
            id,
            user_id,
            date: input.date,
            day: input.day,
            exercises: input.exercises,
            created_at: now,
            updated_at: now,
        };
        store.workouts.push(workout.clone());
        Ok(workout)
    }

    async fn update_workout(
        &self,
        id: &str,
        user_id: Uuid,
        input: WorkoutInput,
    ) -> AppResult<Option<WorkoutLog>> {
        let mut store = self.store.write().await;
        Ok(store
            .workouts
            .iter_mut()
            .find(|w| w.id == id && w.user_id == user_id)
            .map(|w| {
                w.date = input.date;
                w.day = input.day;
                w.exercises = input.exercises;
                w.updated_at = Utc::now();
                w.clone()
            }))
    }

    async fn delete_workout(&self, id: &str, user_id: Uuid) -> AppResult<bool> {
        let mut store = self.store.write().await;
        let before = store.workouts.len();
        store.workouts.retain(|w| !(w.id == id && w.user_id == user_id));
        Ok(store.workouts.len() < before)
    }
}
