use serde::Serialize;
use time::OffsetDateTime;

/// Progress of one login attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthState {
    /// Redirected to the authorization page; verifier waiting in the store.
    Pending,
    /// Code exchanged; the session holds a token pair.
    Exchanged,
    /// The token pair has passed `expires_at`. Login must be restarted.
    Expired,
}

/// One login attempt. The verifier itself lives only in the verifier store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[non_exhaustive]
pub struct AuthSession {
    pub challenge: String,
    pub state: AuthState,
}

impl AuthSession {
    pub(crate) fn pending(challenge: String) -> Self {
        Self {
            challenge,
            state: AuthState::Pending,
        }
    }
}

/// Access/refresh token pair from the token endpoint. `Debug` redacts both tokens.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenPair {
    access_token: String,
    refresh_token: Option<String>,
    expires_at: OffsetDateTime,
}

impl TokenPair {
    #[must_use]
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_at: OffsetDateTime,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
            expires_at,
        }
    }

    #[must_use]
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// Kept for completeness; this crate never uses it to refresh.
    #[must_use]
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    #[must_use]
    pub fn expires_at(&self) -> OffsetDateTime {
        self.expires_at
    }

    #[must_use]
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        now >= self.expires_at
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(OffsetDateTime::now_utc())
    }
}

impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"<redacted>")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "<redacted>"),
            )
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
