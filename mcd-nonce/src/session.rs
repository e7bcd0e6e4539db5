use dashmap::DashMap;
use mcd_core::HttpRequest;
use std::fmt;

/// Cookie carrying the session token.
pub const SESSION_COOKIE: &str = "mcd_session";

/// Header carrying the session token for non-browser clients.
pub const SESSION_HEADER: &str = "X-MCD-Session";

/// Identifier of an authenticated user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Authentication-state check.
pub trait Authenticator: Send + Sync {
    /// The logged-in user for this request, if any.
    fn current_user(&self, request: &HttpRequest) -> Option<UserId>;
}

/// Resolves a session token from the `mcd_session` cookie or the
/// `X-MCD-Session` header against a table of live sessions.
#[derive(Debug, Default)]
pub struct SessionAuthenticator {
    sessions: DashMap<String, UserId>,
}

impl SessionAuthenticator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_sessions<I, S>(sessions: I) -> Self
    where
        I: IntoIterator<Item = (S, UserId)>,
        S: Into<String>,
    {
        let auth = Self::new();
        for (token, user) in sessions {
            auth.insert(token, user);
        }
        auth
    }

    pub fn insert(&self, token: impl Into<String>, user: UserId) {
        self.sessions.insert(token.into(), user);
    }

    pub fn revoke(&self, token: &str) -> Option<UserId> {
        self.sessions.remove(token).map(|(_, user)| user)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn token_from(request: &HttpRequest) -> Option<String> {
        request
            .cookie(SESSION_COOKIE)
            .or_else(|| request.header(SESSION_HEADER).cloned())
            .filter(|token| !token.is_empty())
    }
}

impl Authenticator for SessionAuthenticator {
    fn current_user(&self, request: &HttpRequest) -> Option<UserId> {
        let token = Self::token_from(request)?;
        self.sessions.get(&token).map(|entry| *entry.value())
    }
}
