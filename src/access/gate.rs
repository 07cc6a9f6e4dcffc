use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;

use super::{
    credentials::{AccessContext, RequestCredentials, VerifierState},
    routes::{self, RouteChecks},
};
use crate::config::AppConfig;

/// Where a redirected request is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectTarget {
    Login,
    Home,
    Sysadmin,
    Unauthorized,
}

impl RedirectTarget {
    pub const fn path(self) -> &'static str {
        match self {
            RedirectTarget::Login => routes::LOGIN,
            RedirectTarget::Home => routes::HOME,
            RedirectTarget::Sysadmin => routes::SYSADMIN,
            RedirectTarget::Unauthorized => routes::UNAUTHORIZED,
        }
    }
}

/// The gate's verdict for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Redirect(RedirectTarget),
}

/// evaluate
///
/// The rule table. Rules are checked top to bottom and the first match wins;
/// the order is part of the contract because the categories overlap.
///
/// When both sessions are present the sysadmin rules (3, 4) fire before the
/// regular-user rules (5, 6), so the sysadmin session takes precedence.
pub fn evaluate(route: RouteChecks, has_user_auth: bool, has_sysadmin_auth: bool) -> Decision {
    use Decision::{Allow, Redirect};

    // 1. API routes authenticate per endpoint; /unauthorized must stay reachable.
    if route.is_api_route || route.is_unauthorized_page {
        return Allow;
    }

    // 2. The sysadmin area runs its own login challenge, but never for a
    //    signed-in regular user.
    if route.is_sysadmin_route {
        return if has_user_auth {
            Redirect(RedirectTarget::Unauthorized)
        } else {
            Allow
        };
    }

    // 3. Sysadmins landing on home are sent to their own area.
    if route.is_home_page && has_sysadmin_auth {
        return Redirect(RedirectTarget::Sysadmin);
    }

    // 4. A sysadmin session never reaches a regular-user page.
    if has_sysadmin_auth && !route.is_home_page {
        return Redirect(RedirectTarget::Unauthorized);
    }

    // 5. Default deny.
    if !has_user_auth && !route.is_login_page {
        return Redirect(RedirectTarget::Login);
    }

    // 6. No second login while signed in.
    if has_user_auth && route.is_login_page {
        return Redirect(RedirectTarget::Home);
    }

    Allow
}

/// Classifies `path` and runs the rule table against the verified sessions.
pub fn decide(path: &str, access: &AccessContext) -> Decision {
    evaluate(
        RouteChecks::classify(path),
        access.has_user_auth(),
        access.has_sysadmin_auth(),
    )
}

/// redirect_location
///
/// Absolute URL for a redirect target: the configured public origin if any,
/// else `<scheme>://<Host>`, else the bare path. The scheme comes from a
/// proxy's `X-Forwarded-Proto` (`http` or `https` only) and defaults to `http`.
pub fn redirect_location(
    public_url: Option<&str>,
    headers: &HeaderMap,
    target: RedirectTarget,
) -> String {
    let origin = public_url.map(str::to_string).or_else(|| {
        headers
            .get(header::HOST)
            .and_then(|value| value.to_str().ok())
            .filter(|host| !host.is_empty())
            .map(|host| format!("{}://{host}", forwarded_scheme(headers)))
    });

    match origin {
        Some(origin) => format!("{origin}{}", target.path()),
        None => target.path().to_string(),
    }
}

fn forwarded_scheme(headers: &HeaderMap) -> &'static str {
    let proto = headers
        .get("x-forwarded-proto")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|value| value.trim().to_ascii_lowercase());

    match proto.as_deref() {
        Some("https") => "https",
        _ => "http",
    }
}

/// access_gate
///
/// Middleware run before every route handler. Reads only the request cookies,
/// never the database. On `Allow` the resolved `AccessContext` is attached to
/// the request extensions for the page handlers.
pub async fn access_gate(
    State(verifier): State<VerifierState>,
    State(config): State<AppConfig>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let credentials = RequestCredentials::from_jar(&jar);
    let access = AccessContext::resolve(&credentials, verifier.as_ref());

    match decide(request.uri().path(), &access) {
        Decision::Allow => {
            request.extensions_mut().insert(access);
            next.run(request).await
        }
        Decision::Redirect(target) => {
            let location =
                redirect_location(config.public_url.as_deref(), request.headers(), target);
            tracing::debug!(
                path = %request.uri().path(),
                target = target.path(),
                "access gate redirect"
            );
            Redirect::temporary(&location).into_response()
        }
    }
}
