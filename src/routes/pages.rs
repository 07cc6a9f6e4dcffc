use crate::{
    AppState,
    access::{AccessContext, routes},
};
use axum::{
    Extension, Router,
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::get,
};
use uuid::Uuid;

/// Page Router Module
///
/// Minimal HTML shells for the app's pages. The gate has already decided
/// whether the caller may see a page; handlers only read the `AccessContext`
/// it attached.
pub fn page_routes() -> Router<AppState> {
    Router::new()
        .route(routes::HOME, get(home))
        .route(routes::LOGIN, get(login))
        .route(routes::UNAUTHORIZED, get(unauthorized))
        .route(routes::GYM_LOG, get(gym_log))
        .route(routes::SYSADMIN, get(sysadmin))
        .route("/sysadmin/{*rest}", get(sysadmin))
}

fn layout(title: &str, body: &str) -> Html<String> {
    Html(format!(
        "<!doctype html>\n<html lang=\"en\">\n<head><meta charset=\"utf-8\"><title>{title}</title></head>\n<body>\n<h1>{title}</h1>\n{body}\n</body>\n</html>\n"
    ))
}

/// Session ids only reach markup as canonical UUIDs; anything else renders
/// as an empty attribute.
fn subject_attr(id: Option<&str>) -> String {
    id.and_then(|id| Uuid::parse_str(id).ok())
        .map(|id| id.to_string())
        .unwrap_or_default()
}

async fn home(Extension(access): Extension<AccessContext>) -> Html<String> {
    let user = subject_attr(access.user_id.as_deref());
    layout(
        "Personal Hub",
        &format!(
            "<p data-user-id=\"{user}\">Signed in.</p>\n<nav><a href=\"{}\">Gym log</a></nav>",
            routes::GYM_LOG
        ),
    )
}

async fn login() -> Html<String> {
    layout(
        "Sign in",
        "<form id=\"login\" data-endpoint=\"/api/auth/login\">\n<input name=\"username\" autocomplete=\"username\">\n<input name=\"password\" type=\"password\" autocomplete=\"current-password\">\n<button type=\"submit\">Sign in</button>\n</form>",
    )
}

async fn unauthorized() -> Html<String> {
    layout(
        "Unauthorized",
        &format!(
            "<p>You do not have access to that page.</p>\n<a href=\"{}\">Back to home</a>",
            routes::HOME
        ),
    )
}

async fn gym_log(Extension(access): Extension<AccessContext>) -> Html<String> {
    let user = subject_attr(access.user_id.as_deref());
    layout(
        "Gym log",
        &format!(
            "<section id=\"workouts\" data-user-id=\"{user}\" data-endpoint=\"/api/gym-log/workouts\"></section>"
        ),
    )
}

/// The sysadmin area is reachable without a session; it challenges for
/// sysadmin credentials itself.
async fn sysadmin(Extension(access): Extension<AccessContext>) -> Html<String> {
    match access.sysadmin_id.as_deref() {
        Some(id) => layout(
            "Sysadmin",
            &format!(
                "<section id=\"users\" data-sysadmin-id=\"{}\" data-endpoint=\"/api/sysadmin/users\"></section>\n<form id=\"logout\" data-endpoint=\"/api/sysadmin/auth/logout\"><button type=\"submit\">Sign out</button></form>",
                subject_attr(Some(id))
            ),
        ),
        _ => layout(
            "Sysadmin sign in",
            "<form id=\"sysadmin-login\" data-endpoint=\"/api/sysadmin/auth/login\">\n<input name=\"username\" autocomplete=\"username\">\n<input name=\"password\" type=\"password\" autocomplete=\"current-password\">\n<button type=\"submit\">Sign in</button>\n</form>",
        ),
    }
}

pub async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, layout("Not found", "<p>No such page.</p>"))
}

#[cfg(test)]
mod tests {
    use super::subject_attr;

    #[test]
    fn only_uuids_reach_the_markup() {
        let id = "6f1c1f7e-2d7a-4c1e-9a51-0d4c7f3b8e21";
        assert_eq!(subject_attr(Some(id)), id);
        assert_eq!(subject_attr(Some("x\"><script>alert(1)</script>")), "");
        assert_eq!(subject_attr(Some("u-1")), "");
        assert_eq!(subject_attr(None), "");
    }
}
