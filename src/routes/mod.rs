/// Router Module Index
///
/// API routes grouped by the session they require. Every group sits behind
/// the access gate; the groups that need an identity add their own
/// extractor layer on top.

/// Routes open to any caller: health, sign-in, registration.
pub mod public;

/// Routes that need a regular-user session.
pub mod authenticated;

/// Routes that need a sysadmin session.
pub mod sysadmin;

/// Server-rendered pages.
pub mod pages;
