pub const SCOPE_USER: &str = "user";
pub const SCOPE_ADMIN: &str = "admin";

/// Granted to every newly registered principal.
pub const DEFAULT_SCOPES: &[&str] = &[SCOPE_USER];
