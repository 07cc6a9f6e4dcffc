//! Credential extraction and the shared "is authenticated" predicate.
//!
//! Every consumer (the page gate, the page handlers and the API extractors)
//! resolves sessions through `AccessContext::resolve`, so the cookie parsing
//! and token check exist exactly once.

use std::sync::Arc;

use axum::http::HeaderMap;
use axum_extra::extract::CookieJar;
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{
    config::{AppConfig, SessionMode},
    error::AppResult,
};

pub const USER_TOKEN_COOKIE: &str = "auth_token";
pub const USER_ID_COOKIE: &str = "user_id";
pub const SYSADMIN_TOKEN_COOKIE: &str = "sysadmin_token";
pub const SYSADMIN_ID_COOKIE: &str = "sysadmin_id";

pub const USER_STATIC_TOKEN: &str = "valid_token";
pub const SYSADMIN_STATIC_TOKEN: &str = "sysadmin_valid";

/// Role
///
/// The two independent identity domains. Each has its own cookie pair,
/// token literal and session lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Sysadmin,
}

impl Role {
    pub const fn token_cookie(self) -> &'static str {
        match self {
            Role::User => USER_TOKEN_COOKIE,
            Role::Sysadmin => SYSADMIN_TOKEN_COOKIE,
        }
    }

    pub const fn id_cookie(self) -> &'static str {
        match self {
            Role::User => USER_ID_COOKIE,
            Role::Sysadmin => SYSADMIN_ID_COOKIE,
        }
    }

    pub const fn static_token(self) -> &'static str {
        match self {
            Role::User => USER_STATIC_TOKEN,
            Role::Sysadmin => SYSADMIN_STATIC_TOKEN,
        }
    }

    /// Session lifetime in seconds: one day for users, one hour for sysadmins.
    pub const fn max_age_secs(self) -> i64 {
        match self {
            Role::User => 86_400,
            Role::Sysadmin => 3_600,
        }
    }
}

/// CredentialPair
///
/// The raw (token, id) cookies of one role, exactly as presented.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialPair {
    pub token: Option<String>,
    pub subject_id: Option<String>,
}

impl CredentialPair {
    pub fn new(token: impl Into<String>, subject_id: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            subject_id: Some(subject_id.into()),
        }
    }

    fn from_jar(jar: &CookieJar, role: Role) -> Self {
        Self {
            token: jar.get(role.token_cookie()).map(|c| c.value().to_string()),
            subject_id: jar.get(role.id_cookie()).map(|c| c.value().to_string()),
        }
    }

    /// Both halves, when both are present and non-empty. A partial pair is
    /// indistinguishable from an absent one.
    pub fn complete(&self) -> Option<(&str, &str)> {
        let token = self.token.as_deref().filter(|t| !t.is_empty())?;
        let id = self.subject_id.as_deref().filter(|i| !i.is_empty())?;
        Some((token, id))
    }
}

/// RequestCredentials
///
/// The four credential fields read from a request's cookies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestCredentials {
    pub user: CredentialPair,
    pub sysadmin: CredentialPair,
}

impl RequestCredentials {
    pub fn from_jar(jar: &CookieJar) -> Self {
        Self {
            user: CredentialPair::from_jar(jar, Role::User),
            sysadmin: CredentialPair::from_jar(jar, Role::Sysadmin),
        }
    }

    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self::from_jar(&CookieJar::from_headers(headers))
    }

    pub fn pair(&self, role: Role) -> &CredentialPair {
        match role {
            Role::User => &self.user,
            Role::Sysadmin => &self.sysadmin,
        }
    }
}

/// CredentialVerifier
///
/// Decides whether a presented (token, id) pair denotes a live session for a
/// role, and mints the token value stored at login. Implementations must be
/// pure computation: the gate calls `verify` on every request and must not
/// depend on downstream services.
pub trait CredentialVerifier: Send + Sync {
    fn issue(&self, role: Role, subject_id: &str) -> AppResult<String>;

    fn verify(&self, role: Role, token: &str, subject_id: &str) -> bool;
}

pub type VerifierState = Arc<dyn CredentialVerifier>;

/// Builds the verifier selected by `SESSION_MODE`.
pub fn verifier_from_config(config: &AppConfig) -> VerifierState {
    match config.session_mode {
        SessionMode::Static => Arc::new(StaticTokenVerifier),
        SessionMode::Signed => Arc::new(SignedTokenVerifier::new(&config.session_secret)),
    }
}

/// StaticTokenVerifier
///
/// A session is valid when the token equals the role's well-known literal and
/// the id is non-empty. Anyone who knows the literal can claim any id: this is
/// token equality, not session validation.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticTokenVerifier;

impl CredentialVerifier for StaticTokenVerifier {
    fn issue(&self, role: Role, _subject_id: &str) -> AppResult<String> {
        Ok(role.static_token().to_string())
    }

    fn verify(&self, role: Role, token: &str, subject_id: &str) -> bool {
        token == role.static_token() && !subject_id.is_empty()
    }
}

/// SessionClaims
///
/// Payload of a signed session token. `sub` must match the id cookie.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub role: Role,
    pub iat: usize,
    pub exp: usize,
}

/// SignedTokenVerifier
///
/// HS256 session tokens bound to a role and subject, expiring with the
/// role's cookie max-age.
#[derive(Clone)]
pub struct SignedTokenVerifier {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl SignedTokenVerifier {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn encode_claims(&self, claims: &SessionClaims) -> AppResult<String> {
        Ok(encode(&Header::new(Algorithm::HS256), claims, &self.encoding)?)
    }
}

impl CredentialVerifier for SignedTokenVerifier {
    fn issue(&self, role: Role, subject_id: &str) -> AppResult<String> {
        let now = Utc::now().timestamp().max(0) as usize;
        self.encode_claims(&SessionClaims {
            sub: subject_id.to_string(),
            role,
            iat: now,
            exp: now + role.max_age_secs() as usize,
        })
    }

    fn verify(&self, role: Role, token: &str, subject_id: &str) -> bool {
        let validation = Validation::new(Algorithm::HS256);
        match decode::<SessionClaims>(token, &self.decoding, &validation) {
            Ok(data) => data.claims.role == role && data.claims.sub == subject_id,
            Err(e) => {
                tracing::debug!(?role, error = %e, "rejected session token");
                false
            }
        }
    }
}

/// AccessContext
///
/// The verified identities of a request, one optional subject id per role.
/// Produced once by the gate, attached to the request extensions and read by
/// page handlers instead of re-parsing cookies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessContext {
    pub user_id: Option<String>,
    pub sysadmin_id: Option<String>,
}

impl AccessContext {
    pub fn resolve(credentials: &RequestCredentials, verifier: &dyn CredentialVerifier) -> Self {
        let verified = |role: Role| {
            credentials
                .pair(role)
                .complete()
                .filter(|(token, id)| verifier.verify(role, token, id))
                .map(|(_, id)| id.to_string())
        };

        Self {
            user_id: verified(Role::User),
            sysadmin_id: verified(Role::Sysadmin),
        }
    }

    pub fn has_user_auth(&self) -> bool {
        self.user_id.is_some()
    }

    pub fn has_sysadmin_auth(&self) -> bool {
        self.sysadmin_id.is_some()
    }

    pub fn subject(&self, role: Role) -> Option<&str> {
        match role {
            Role::User => self.user_id.as_deref(),
            Role::Sysadmin => self.sysadmin_id.as_deref(),
        }
    }
}
