//! Role-based access control for page requests.
//!
//! Two identity domains (regular user, sysadmin) are carried by independent
//! cookie pairs. The gate classifies the path, verifies both pairs and maps
//! the result onto allow or a redirect. It is pure and stateless: it reads the
//! request cookies and nothing else.

pub mod credentials;
pub mod gate;
pub mod routes;

pub use credentials::{AccessContext, CredentialVerifier, Role, VerifierState};
pub use gate::{Decision, RedirectTarget, access_gate, decide};
pub use routes::RouteChecks;
