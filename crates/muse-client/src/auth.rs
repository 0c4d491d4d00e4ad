//! Authentication collaborator interface
//!
//! Authentication mechanics live outside this crate; the session only
//! needs an opaque bearer token at request time.

/// Supplies the bearer token attached to relay requests
pub trait TokenProvider: Send + Sync {
    /// The current token, or `None` when the user is unauthenticated
    fn bearer_token(&self) -> Option<String>;
}

/// Fixed token, useful for tests and single-user tools
pub struct StaticToken(pub String);

impl TokenProvider for StaticToken {
    fn bearer_token(&self) -> Option<String> {
        Some(self.0.clone())
    }
}
