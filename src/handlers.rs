use crate::{
    AppState,
    access::Role,
    auth::{self, AuthSysadmin, AuthUser},
    error::{AppError, AppResult},
    models::{
        ChangePasswordRequest, CreateUserRequest, DeleteWorkoutResponse, LoginRequest,
        LoginResponse, MessageResponse, NewUser, SysadminLoginResponse, SysadminMeResponse,
        UpdateUserRequest, User, UserLookup, UserRecord, WorkoutInput, WorkoutLog, normalize_email,
    },
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use axum_extra::extract::CookieJar;
use uuid::Uuid;

const INVALID_CREDENTIALS: &str = "Invalid username or password";

// --- Shared helpers ---

/// Rejects a username or email already held by another user.
async fn ensure_available(
    state: &AppState,
    username: Option<&str>,
    email: Option<&str>,
    except: Option<Uuid>,
) -> AppResult<()> {
    if let Some(username) = username {
        if let Some(existing) = state.repo.find_user_by_username(username).await? {
            if Some(existing.id) != except {
                return Err(AppError::Conflict("Username already exists".into()));
            }
        }
    }
    if let Some(email) = email {
        if let Some(existing) = state.repo.find_user_by_email(email).await? {
            if Some(existing.id) != except {
                return Err(AppError::Conflict("Email already exists".into()));
            }
        }
    }
    Ok(())
}

async fn create_user_account(state: &AppState, req: &CreateUserRequest) -> AppResult<User> {
    let email = req.normalized_email();
    ensure_available(state, Some(&req.username), email.as_deref(), None).await?;

    let password_hash = state.hasher.hash(&req.password).await?;
    let user = state
        .repo
        .create_user(NewUser {
            username: req.username.clone(),
            email,
            password_hash,
        })
        .await?;

    tracing::info!(user_id = %user.id, username = %user.username, "user created");
    Ok(user)
}

/// Ids that are not UUIDs cannot name a stored user.
fn parse_user_id(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound("User not found".into()))
}

fn workout_not_found() -> AppError {
    AppError::NotFound("Workout not found".into())
}

// --- Regular-user authentication ---

/// login
///
/// [Public Route] Verifies a username/password pair and opens a user session:
/// `auth_token` and `user_id` cookies, set together, valid for one day.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = LoginResponse),
        (status = 400, description = "Missing fields"),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> AppResult<(CookieJar, Json<LoginResponse>)> {
    payload.validate()?;

    let user = state
        .repo
        .find_user_by_username(&payload.username)
        .await?
        .ok_or_else(|| AppError::Unauthorized(INVALID_CREDENTIALS.into()))?;

    if !state
        .hasher
        .verify(&payload.password, &user.password_hash)
        .await?
    {
        tracing::warn!(username = %payload.username, "user login rejected");
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()));
    }

    let subject = user.id.to_string();
    let token = state.verifier.issue(Role::User, &subject)?;
    let jar = auth::start_session(jar, Role::User, &token, &subject)?;

    tracing::info!(user_id = %user.id, "user signed in");
    Ok((
        jar,
        Json(LoginResponse {
            user: user.record(),
            message: "Login successful".into(),
        }),
    ))
}

/// logout
///
/// [Public Route] Clears both user session cookies. Idempotent.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses((status = 200, description = "Signed out", body = MessageResponse))
)]
pub async fn logout(jar: CookieJar) -> (CookieJar, Json<MessageResponse>) {
    (
        auth::end_session(jar, Role::User),
        Json(MessageResponse::new("Logged out")),
    )
}

/// get_me
///
/// [Authenticated Route] The signed-in user's profile.
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Profile", body = UserRecord),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn get_me(AuthUser { user }: AuthUser) -> Json<UserRecord> {
    Json(user.record())
}

/// change_password
///
/// [Authenticated Route] Replaces the user's password after re-checking the
/// current one. The new password must differ from the current one.
#[utoipa::path(
    post,
    path = "/api/auth/change-password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Changed", body = MessageResponse),
        (status = 400, description = "Invalid new password"),
        (status = 401, description = "Not signed in or wrong current password")
    )
)]
pub async fn change_password(
    AuthUser { user }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<ChangePasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    payload.validate()?;

    if !state
        .hasher
        .verify(&payload.old_password, &user.password_hash)
        .await?
    {
        return Err(AppError::Unauthorized("Current password is incorrect".into()));
    }
    if state
        .hasher
        .verify(&payload.new_password, &user.password_hash)
        .await?
    {
        return Err(AppError::BadRequest(
            "New password must be different from current password".into(),
        ));
    }

    let password_hash = state.hasher.hash(&payload.new_password).await?;
    if !state.repo.set_user_password(user.id, password_hash).await? {
        return Err(AppError::NotFound("User not found".into()));
    }

    tracing::info!(user_id = %user.id, "password changed");
    Ok(Json(MessageResponse::new("Password changed successfully")))
}

// --- Registration & lookup ---

/// register_user
///
/// [Public Route] Creates a regular user account.
#[utoipa::path(
    post,
    path = "/api/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "Registered", body = UserRecord),
        (status = 400, description = "Missing fields"),
        (status = 409, description = "Username or email taken")
    )
)]
pub async fn register_user(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<UserRecord>)> {
    payload.validate(false)?;
    let user = create_user_account(&state, &payload).await?;
    Ok((StatusCode::CREATED, Json(user.record())))
}

/// get_user_by_username
///
/// [Public Route] Looks a user up by username.
#[utoipa::path(
    get,
    path = "/api/users",
    params(UserLookup),
    responses(
        (status = 200, description = "Found", body = UserRecord),
        (status = 400, description = "Username missing"),
        (status = 404, description = "Unknown user")
    )
)]
pub async fn get_user_by_username(
    State(state): State<AppState>,
    Query(lookup): Query<UserLookup>,
) -> AppResult<Json<UserRecord>> {
    let username = lookup
        .username
        .filter(|u| !u.is_empty())
        .ok_or_else(|| AppError::BadRequest("Username is required".into()))?;

    state
        .repo
        .find_user_by_username(&username)
        .await?
        .map(|user| Json(user.record()))
        .ok_or_else(|| AppError::NotFound("User not found".into()))
}

// --- Sysadmin authentication ---

/// sysadmin_login
///
/// [Public Route] Opens a sysadmin session: `sysadmin_token` and
/// `sysadmin_id` cookies, valid for one hour. Separate from user sessions.
#[utoipa::path(
    post,
    path = "/api/sysadmin/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = SysadminLoginResponse),
        (status = 400, description = "Missing fields"),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn sysadmin_login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> AppResult<(CookieJar, Json<SysadminLoginResponse>)> {
    payload.validate()?;

    let admin = state
        .repo
        .find_sysadmin_by_username(&payload.username)
        .await?
        .ok_or_else(|| AppError::Unauthorized(INVALID_CREDENTIALS.into()))?;

    if !state
        .hasher
        .verify(&payload.password, &admin.password_hash)
        .await?
    {
        tracing::warn!(username = %payload.username, "sysadmin login rejected");
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()));
    }

    let subject = admin.id.to_string();
    let token = state.verifier.issue(Role::Sysadmin, &subject)?;
    let jar = auth::start_session(jar, Role::Sysadmin, &token, &subject)?;

    tracing::info!(sysadmin_id = %admin.id, "sysadmin signed in");
    Ok((
        jar,
        Json(SysadminLoginResponse {
            admin: admin.record(),
            message: "Sysadmin login successful".into(),
        }),
    ))
}

/// sysadmin_logout
///
/// [Public Route] Clears both sysadmin session cookies. Idempotent.
#[utoipa::path(
    post,
    path = "/api/sysadmin/auth/logout",
    responses((status = 200, description = "Signed out", body = MessageResponse))
)]
pub async fn sysadmin_logout(jar: CookieJar) -> (CookieJar, Json<MessageResponse>) {
    (
        auth::end_session(jar, Role::Sysadmin),
        Json(MessageResponse::new("Logged out")),
    )
}

/// sysadmin_me
///
/// [Public Route] The signed-in sysadmin, or 401 `Not authenticated`. The
/// sysadmin page uses this to decide between its login form and dashboard.
#[utoipa::path(
    get,
    path = "/api/sysadmin/auth/me",
    responses(
        (status = 200, description = "Current sysadmin", body = SysadminMeResponse),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn sysadmin_me(
    admin: Result<AuthSysadmin, AppError>,
) -> AppResult<Json<SysadminMeResponse>> {
    match admin {
        Ok(AuthSysadmin { admin }) => Ok(Json(SysadminMeResponse {
            admin: admin.record(),
        })),
        Err(AppError::Unauthorized(_)) => Err(AppError::Unauthorized("Not authenticated".into())),
        Err(e) => Err(e),
    }
}

// --- Sysadmin user management ---

/// list_users
///
/// [Sysadmin Route] All users, newest first.
#[utoipa::path(
    get,
    path = "/api/sysadmin/users",
    responses(
        (status = 200, description = "Users", body = [UserRecord]),
        (status = 401, description = "Sysadmin session required")
    )
)]
pub async fn list_users(
    _admin: AuthSysadmin,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<UserRecord>>> {
    let users = state.repo.list_users().await?;
    Ok(Json(users.iter().map(User::record).collect()))
}

/// create_user
///
/// [Sysadmin Route] Creates a user; passwords must have at least six
/// characters.
#[utoipa::path(
    post,
    path = "/api/sysadmin/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "Created", body = UserRecord),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Username or email taken")
    )
)]
pub async fn create_user(
    AuthSysadmin { admin }: AuthSysadmin,
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<UserRecord>)> {
    payload.validate(true)?;
    let user = create_user_account(&state, &payload).await?;
    tracing::info!(sysadmin_id = %admin.id, user_id = %user.id, "sysadmin created user");
    Ok((StatusCode::CREATED, Json(user.record())))
}

#[utoipa::path(
    get,
    path = "/api/sysadmin/users/{id}",
    params(("id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "User", body = UserRecord),
        (status = 404, description = "Unknown user")
    )
)]
pub async fn get_user(
    _admin: AuthSysadmin,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<UserRecord>> {
    let id = parse_user_id(&id)?;
    state
        .repo
        .find_user(id)
        .await?
        .map(|user| Json(user.record()))
        .ok_or_else(|| AppError::NotFound("User not found".into()))
}

/// update_user
///
/// [Sysadmin Route] Partial update. A password, when present, is validated
/// and re-hashed; username and email are checked for conflicts with other
/// users.
#[utoipa::path(
    put,
    path = "/api/sysadmin/users/{id}",
    params(("id" = String, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated", body = UserRecord),
        (status = 400, description = "Password too short"),
        (status = 404, description = "Unknown user"),
        (status = 409, description = "Username or email taken")
    )
)]
pub async fn update_user(
    AuthSysadmin { admin }: AuthSysadmin,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateUserRequest>,
) -> AppResult<Json<UserRecord>> {
    let id = parse_user_id(&id)?;
    let password = payload.password()?;
    let profile = payload.profile();

    if !profile.is_empty() {
        let email = normalize_email(profile.email.as_deref());
        ensure_available(&state, profile.username.as_deref(), email.as_deref(), Some(id)).await?;
    }

    if let Some(password) = password {
        let password_hash = state.hasher.hash(password).await?;
        if !state.repo.set_user_password(id, password_hash).await? {
            return Err(AppError::NotFound("User not found".into()));
        }
    }

    let user = if profile.is_empty() {
        state.repo.find_user(id).await?
    } else {
        state.repo.update_user(id, profile).await?
    }
    .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    tracing::info!(sysadmin_id = %admin.id, user_id = %user.id, "sysadmin updated user");
    Ok(Json(user.record()))
}

#[utoipa::path(
    delete,
    path = "/api/sysadmin/users/{id}",
    params(("id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 404, description = "Unknown user")
    )
)]
pub async fn delete_user(
    AuthSysadmin { admin }: AuthSysadmin,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    let id = parse_user_id(&id)?;
    if !state.repo.delete_user(id).await? {
        return Err(AppError::NotFound("User not found".into()));
    }

    tracing::info!(sysadmin_id = %admin.id, user_id = %id, "sysadmin deleted user");
    Ok(Json(MessageResponse::new("User deleted successfully")))
}

// --- Gym log ---

/// list_workouts
///
/// [Authenticated Route] The caller's workouts, newest date first.
#[utoipa::path(
    get,
    path = "/api/gym-log/workouts",
    responses(
        (status = 200, description = "Workouts", body = [WorkoutLog]),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn list_workouts(
    AuthUser { user }: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<WorkoutLog>>> {
    Ok(Json(state.repo.list_workouts(user.id).await?))
}

/// create_workout
///
/// [Authenticated Route] Stores a workout owned by the caller. Any owner sent
/// in the body is ignored.
#[utoipa::path(
    post,
    path = "/api/gym-log/workouts",
    request_body = WorkoutInput,
    responses(
        (status = 201, description = "Created", body = WorkoutLog),
        (status = 400, description = "Missing date or day")
    )
)]
pub async fn create_workout(
    AuthUser { user }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<WorkoutInput>,
) -> AppResult<(StatusCode, Json<WorkoutLog>)> {
    payload.validate()?;
    let workout = state.repo.create_workout(user.id, payload).await?;
    Ok((StatusCode::CREATED, Json(workout)))
}

#[utoipa::path(
    get,
    path = "/api/gym-log/workouts/{id}",
    params(("id" = String, Path, description = "Workout ID")),
    responses(
        (status = 200, description = "Workout", body = WorkoutLog),
        (status = 404, description = "Not found or not owned")
    )
)]
pub async fn get_workout(
    AuthUser { user }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<WorkoutLog>> {
    state
        .repo
        .get_workout(&id, user.id)
        .await?
        .map(Json)
        .ok_or_else(workout_not_found)
}

/// update_workout
///
/// [Authenticated Route] Replaces the workout's date, day and exercises.
/// The owner cannot change; another user's workout answers 404.
#[utoipa::path(
    put,
    path = "/api/gym-log/workouts/{id}",
    params(("id" = String, Path, description = "Workout ID")),
    request_body = WorkoutInput,
    responses(
        (status = 200, description = "Updated", body = WorkoutLog),
        (status = 404, description = "Not found or not owned")
    )
)]
pub async fn update_workout(
    AuthUser { user }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<WorkoutInput>,
) -> AppResult<Json<WorkoutLog>> {
    payload.validate()?;
    state
        .repo
        .update_workout(&id, user.id, payload)
        .await?
        .map(Json)
        .ok_or_else(workout_not_found)
}

#[utoipa::path(
    delete,
    path = "/api/gym-log/workouts/{id}",
    params(("id" = String, Path, description = "Workout ID")),
    responses(
        (status = 200, description = "Deleted", body = DeleteWorkoutResponse),
        (status = 404, description = "Not found or not owned")
    )
)]
pub async fn delete_workout(
    AuthUser { user }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<DeleteWorkoutResponse>> {
    if !state.repo.delete_workout(&id, user.id).await? {
        return Err(workout_not_found());
    }
    Ok(Json(DeleteWorkoutResponse { success: true }))
}
