//! The API endpoint URIs.

/// Registration: POST creates a new user and their default account.
pub const USERS: &str = "/api/users";

/// Dashboard: GET returns the caller's accounts and current-month summary.
pub const DASHBOARD: &str = "/api/dashboard";
