//! Route constants and the path classifier used by the gate.

pub const HOME: &str = "/";
pub const LOGIN: &str = "/login";
pub const SYSADMIN: &str = "/sysadmin";
pub const UNAUTHORIZED: &str = "/unauthorized";
pub const GYM_LOG: &str = "/gym-log";
pub const API: &str = "/api";

/// RouteChecks
///
/// The boolean route categories of a request path. Categories overlap (the
/// home page is also a protected page), so the gate's rule order decides
/// which one wins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouteChecks {
    pub is_login_page: bool,
    pub is_api_route: bool,
    pub is_sysadmin_route: bool,
    pub is_unauthorized_page: bool,
    pub is_home_page: bool,
}

impl RouteChecks {
    /// Prefix match for the API and sysadmin roots, exact match for the
    /// login, unauthorized and home pages.
    ///
    /// Prefixes are matched on raw characters, so `/sysadmin-tools` is part of
    /// the sysadmin area and `/apis` is an API path.
    pub fn classify(path: &str) -> Self {
        Self {
            is_login_page: path == LOGIN,
            is_api_route: path.starts_with(API),
            is_sysadmin_route: path.starts_with(SYSADMIN),
            is_unauthorized_page: path == UNAUTHORIZED,
            is_home_page: path == HOME,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_pages_do_not_match_subpaths() {
        assert!(RouteChecks::classify("/login").is_login_page);
        assert!(!RouteChecks::classify("/login/extra").is_login_page);
        assert!(RouteChecks::classify("/").is_home_page);
        assert!(!RouteChecks::classify("/gym-log").is_home_page);
        assert!(RouteChecks::classify("/unauthorized").is_unauthorized_page);
        assert!(!RouteChecks::classify("/unauthorized/").is_unauthorized_page);
    }

    #[test]
    fn roots_match_by_prefix() {
        let api = RouteChecks::classify("/api/gym-log/workouts");
        assert!(api.is_api_route);
        assert!(!api.is_sysadmin_route);

        assert!(RouteChecks::classify("/sysadmin").is_sysadmin_route);
        assert!(RouteChecks::classify("/sysadmin/users").is_sysadmin_route);
        // The sysadmin API lives under /api, not the sysadmin area.
        assert!(!RouteChecks::classify("/api/sysadmin/users").is_sysadmin_route);
    }

    #[test]
    fn ordinary_pages_have_no_category() {
        assert_eq!(RouteChecks::classify("/gym-log"), RouteChecks::default());
    }
}
