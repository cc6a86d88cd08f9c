//! Caller credentials.
//!
//! The service accepts either an API token (sent as the `auth_token` query
//! parameter) or an account username and password (sent as HTTP Basic auth).
//! The two modes are never combined, which the enum enforces.
//!
//! Secrets are redacted in Debug output so credentials can sit inside
//! structs that get logged.

use std::fmt;

#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    Token(String),
    Basic { username: String, password: String },
}

impl Credentials {
    pub fn token(token: impl Into<String>) -> Self {
        Credentials::Token(token.into())
    }

    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Credentials::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Pick the mode from a pair of loosely supplied values: both non-empty
    /// means username and password, only the first means a token, nothing
    /// means no credentials at all.
    pub fn from_parts(username_or_token: &str, password: &str) -> Option<Self> {
        match (username_or_token.is_empty(), password.is_empty()) {
            (true, _) => None,
            (false, false) => Some(Self::basic(username_or_token, password)),
            (false, true) => Some(Self::token(username_or_token)),
        }
    }

    /// Whether these credentials can authenticate a request at all.
    pub fn is_usable(&self) -> bool {
        match self {
            Credentials::Token(token) => !token.is_empty(),
            Credentials::Basic { username, password } => !username.is_empty() && !password.is_empty(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Token(_) => f.debug_tuple("Token").field(&"[REDACTED]").finish(),
            Credentials::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"[REDACTED]")
                .finish(),
        }
    }
}
