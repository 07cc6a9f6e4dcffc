use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Minimum length for any password set through the API.
pub const MIN_PASSWORD_LEN: usize = 6;

// --- Identity records (mapped to the database) ---

/// User
///
/// A regular user row from the `users` table. Carries the password hash, so it
/// never leaves the server; handlers answer with `UserRecord`.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: Option<String>,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn record(&self) -> UserRecord {
        UserRecord {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// UserRecord
///
/// The public view of a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UserRecord {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Sysadmin
///
/// A row from the `sysadmins` table. Sysadmins are a separate identity domain
/// and are never users.
#[derive(Debug, Clone, FromRow)]
pub struct Sysadmin {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Sysadmin {
    pub fn record(&self) -> SysadminRecord {
        SysadminRecord {
            id: self.id,
            username: self.username.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SysadminRecord {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// NewUser
///
/// Insert payload for the repository; the password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: Option<String>,
    pub password_hash: String,
}

/// UserUpdate
///
/// Profile fields to change; `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
}

impl UserUpdate {
    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.email.is_none()
    }
}

// --- Gym log documents ---

/// WorkoutSet
///
/// One set of an exercise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct WorkoutSet {
    pub id: String,
    pub weight: f64,
    pub reps: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Exercise {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub sets: Vec<WorkoutSet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// WorkoutLog
///
/// A workout document. `id` is the client-facing key; `user_id` is the owner
/// and is always taken from the session, never from the request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct WorkoutLog {
    pub id: String,
    pub user_id: Uuid,
    pub date: String,
    pub day: String,
    pub exercises: Vec<Exercise>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// WorkoutInput
///
/// Body of POST and PUT on workouts. Owner and timestamps are ignored if sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct WorkoutInput {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub day: String,
    #[serde(default)]
    pub exercises: Vec<Exercise>,
}

impl WorkoutInput {
    pub fn validate(&self) -> AppResult<()> {
        if self.date.trim().is_empty() || self.day.trim().is_empty() {
            return Err(AppError::BadRequest("Workout date and day are required".into()));
        }
        Ok(())
    }
}

// --- Request payloads ---

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl LoginRequest {
    pub fn validate(&self) -> AppResult<()> {
        if self.username.is_empty() || self.password.is_empty() {
            return Err(AppError::BadRequest("Username and password are required".into()));
        }
        Ok(())
    }
}

/// CreateUserRequest
///
/// Used by public registration and by the sysadmin console. An empty email is
/// treated as no email.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CreateUserRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: String,
}

impl CreateUserRequest {
    pub fn validate(&self, enforce_length: bool) -> AppResult<()> {
        if self.username.is_empty() || self.password.is_empty() {
            return Err(AppError::BadRequest("Username and password are required".into()));
        }
        if enforce_length {
            check_password_length(&self.password, "Password")?;
        }
        Ok(())
    }

    pub fn normalized_email(&self) -> Option<String> {
        normalize_email(self.email.as_deref())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UpdateUserRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl UpdateUserRequest {
    pub fn profile(&self) -> UserUpdate {
        UserUpdate {
            username: self.username.clone().filter(|u| !u.is_empty()),
            email: self.email.clone(),
        }
    }

    /// The new password, if one was sent.
    pub fn password(&self) -> AppResult<Option<&str>> {
        match self.password.as_deref().filter(|p| !p.is_empty()) {
            Some(password) => {
                check_password_length(password, "Password")?;
                Ok(Some(password))
            }
            None => Ok(None),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub old_password: String,
    #[serde(default)]
    pub new_password: String,
}

impl ChangePasswordRequest {
    pub fn validate(&self) -> AppResult<()> {
        if self.old_password.is_empty() || self.new_password.is_empty() {
            return Err(AppError::BadRequest(
                "Old password and new password are required".into(),
            ));
        }
        check_password_length(&self.new_password, "New password")
    }
}

/// Query string of `GET /api/users`.
#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserLookup {
    pub username: Option<String>,
}

// --- Responses ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginResponse {
    pub user: UserRecord,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SysadminLoginResponse {
    pub admin: SysadminRecord,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SysadminMeResponse {
    pub admin: SysadminRecord,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct DeleteWorkoutResponse {
    pub success: bool,
}

// --- Helpers ---

fn check_password_length(password: &str, label: &str) -> AppResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(format!(
            "{label} must be at least {MIN_PASSWORD_LEN} characters long"
        )));
    }
    Ok(())
}

/// Trims an email and maps blank values to `None`.
pub fn normalize_email(email: Option<&str>) -> Option<String> {
    email
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_requires_both_fields() {
        let missing = LoginRequest {
            username: "ana".into(),
            password: String::new(),
        };
        assert!(matches!(missing.validate(), Err(AppError::BadRequest(_))));
        let ok = LoginRequest {
            username: "ana".into(),
            password: "secret".into(),
        };
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn short_passwords_only_fail_when_enforced() {
        let req = CreateUserRequest {
            username: "ana".into(),
            email: None,
            password: "abc".into(),
        };
        assert!(req.validate(false).is_ok());
        assert!(matches!(req.validate(true), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn change_password_messages() {
        let short = ChangePasswordRequest {
            old_password: "old-secret".into(),
            new_password: "abc".into(),
        };
        let err = short.validate().unwrap_err();
        assert_eq!(err.to_string(), "New password must be at least 6 characters long");
    }

    #[test]
    fn blank_emails_are_dropped() {
        assert_eq!(normalize_email(Some("  ")), None);
        assert_eq!(normalize_email(Some(" a@b.c ")), Some("a@b.c".to_string()));
        assert_eq!(normalize_email(None), None);
    }

    #[test]
    fn update_request_password_is_optional() {
        let none = UpdateUserRequest::default();
        assert_eq!(none.password().unwrap(), None);

        let short = UpdateUserRequest {
            password: Some("123".into()),
            ..Default::default()
        };
        assert!(short.password().is_err());
    }

    #[test]
    fn user_record_uses_frontend_field_names() {
        let now = Utc::now();
        let user = User {
            id: Uuid::nil(),
            username: "ana".into(),
            email: None,
            password_hash: "hash".into(),
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(user.record()).unwrap();
        assert!(json.get("_id").is_some());
        assert!(json.get("createdAt").is_some());
        assert!(json.get("email").is_none());
        assert!(json.get("password_hash").is_none());
    }

    #[test]
    fn workout_input_ignores_owner_fields() {
        let input: WorkoutInput = serde_json::from_value(serde_json::json!({
            "id": "w1",
            "userId": "00000000-0000-0000-0000-000000000009",
            "date": "2025-01-10",
            "day": "Push",
            "exercises": [{ "id": "e1", "name": "Bench", "sets": [{ "id": "s1", "weight": 60.0, "reps": 8 }] }]
        }))
        .unwrap();
        assert_eq!(input.id, "w1");
        assert_eq!(input.exercises[0].sets[0].reps, 8);
        assert!(input.validate().is_ok());
        assert!(WorkoutInput::default().validate().is_err());
    }
}
