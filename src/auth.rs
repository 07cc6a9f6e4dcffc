use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::extract::{
    CookieJar,
    cookie::{Cookie, SameSite},
};
use uuid::Uuid;

use crate::{
    access::{
        AccessContext, Role, VerifierState,
        credentials::RequestCredentials,
    },
    error::{AppError, AppResult},
    models::{Sysadmin, User},
    repository::RepositoryState,
};

/// AuthUser Extractor Result
///
/// The regular user behind the request's `auth_token`/`user_id` session.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: User,
}

/// AuthSysadmin Extractor Result
///
/// The sysadmin behind the request's `sysadmin_token`/`sysadmin_id` session.
#[derive(Debug, Clone)]
pub struct AuthSysadmin {
    pub admin: Sysadmin,
}

/// Reads the verified subject for `role`.
///
/// The gate has normally attached an `AccessContext` already; otherwise the
/// cookies are resolved here with the same verifier, so API routes and pages
/// can never disagree about who is signed in.
fn session_subject<S>(parts: &Parts, state: &S, role: Role) -> Option<Uuid>
where
    VerifierState: FromRef<S>,
{
    let access = match parts.extensions.get::<AccessContext>() {
        Some(access) => access.clone(),
        None => {
            let verifier = VerifierState::from_ref(state);
            AccessContext::resolve(
                &RequestCredentials::from_headers(&parts.headers),
                verifier.as_ref(),
            )
        }
    };

    access
        .subject(role)
        .and_then(|id| Uuid::parse_str(id).ok())
}

/// AuthUser Extractor Implementation
///
/// 1. Reuse an identity already resolved earlier in the request.
/// 2. Verify the user cookie pair.
/// 3. Load the user; a session for a deleted user is not a session.
///
/// Rejection: 401 `{"error": "Unauthorized"}`.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    VerifierState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(cached) = parts.extensions.get::<AuthUser>() {
            return Ok(cached.clone());
        }
        let unauthorized = || AppError::Unauthorized("Unauthorized".into());

        let id = session_subject(parts, state, Role::User).ok_or_else(unauthorized)?;
        let repo = RepositoryState::from_ref(state);
        let user = repo.find_user(id).await?.ok_or_else(unauthorized)?;

        let auth = AuthUser { user };
        parts.extensions.insert(auth.clone());
        Ok(auth)
    }
}

impl<S> FromRequestParts<S> for AuthSysadmin
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    VerifierState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(cached) = parts.extensions.get::<AuthSysadmin>() {
            return Ok(cached.clone());
        }
        let unauthorized =
            || AppError::Unauthorized("Unauthorized - sysadmin access required".into());

        let id = session_subject(parts, state, Role::Sysadmin).ok_or_else(unauthorized)?;
        let repo = RepositoryState::from_ref(state);
        let admin = repo.find_sysadmin(id).await?.ok_or_else(unauthorized)?;

        let auth = AuthSysadmin { admin };
        parts.extensions.insert(auth.clone());
        Ok(auth)
    }
}

// --- Session cookies ---

fn session_cookie(name: &str, value: &str, max_age_secs: i64) -> AppResult<Cookie<'static>> {
    let mut cookie = Cookie::parse(format!(
        "{name}={value}; Path=/; Max-Age={max_age_secs}"
    ))
    .map_err(|e| AppError::Internal(format!("invalid session cookie: {e}")))?;
    cookie.set_same_site(SameSite::Strict);
    cookie.set_http_only(true);
    Ok(cookie)
}

/// start_session
///
/// Writes the token and id cookies of `role` together, both with the role's
/// max-age.
pub fn start_session(jar: CookieJar, role: Role, token: &str, subject_id: &str) -> AppResult<CookieJar> {
    let max_age = role.max_age_secs();
    Ok(jar
        .add(session_cookie(role.token_cookie(), token, max_age)?)
        .add(session_cookie(role.id_cookie(), subject_id, max_age)?))
}

/// end_session
///
/// Clears both cookies of `role` together; the other role is untouched.
pub fn end_session(jar: CookieJar, role: Role) -> CookieJar {
    jar.remove(Cookie::build(role.token_cookie()).path("/"))
        .remove(Cookie::build(role.id_cookie()).path("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_session_sets_both_cookies() {
        let jar = start_session(CookieJar::new(), Role::Sysadmin, "sysadmin_valid", "a1").unwrap();

        let token = jar.get("sysadmin_token").unwrap();
        assert_eq!(token.value(), "sysadmin_valid");
        assert_eq!(token.path(), Some("/"));
        assert_eq!(token.same_site(), Some(SameSite::Strict));
        assert_eq!(token.max_age().map(|d| d.whole_seconds()), Some(3_600));
        assert_eq!(jar.get("sysadmin_id").unwrap().value(), "a1");
        assert!(jar.get("auth_token").is_none());
    }

    #[test]
    fn end_session_only_touches_one_role() {
        let jar = start_session(CookieJar::new(), Role::User, "valid_token", "u1").unwrap();
        let jar = start_session(jar, Role::Sysadmin, "sysadmin_valid", "a1").unwrap();

        let jar = end_session(jar, Role::User);
        assert!(jar.get("auth_token").is_none());
        assert!(jar.get("user_id").is_none());
        assert!(jar.get("sysadmin_token").is_some());
    }
}
