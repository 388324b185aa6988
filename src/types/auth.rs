//! Credential types for the login endpoint.

use serde::Serialize;

/// A username/password credential pair for `/user/login`.
///
/// Production callers must supply real credentials;
/// [`Credentials::demo`] exists for demo and test environments only.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Account username.
    pub username: String,
    /// Account password.
    pub password: String,
}

impl Credentials {
    /// Create a credential pair.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// The `demo`/`demo` pair accepted by demo deployments of the backend.
    pub fn demo() -> Self {
        Self::new("demo", "demo")
    }

    /// Whether both fields are non-empty.
    pub fn is_complete(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }
}

/// JSON body sent to the login endpoint.
#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    /// Account username.
    pub username: &'a str,
    /// Account password.
    pub password: &'a str,
}
