use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::PrivateCookieJar;
use time::OffsetDateTime;

use super::cookies;
use super::error::ApiError;
use super::state::ServerState;
use crate::classify::Classifier;
use crate::error::Error;
use crate::verifier_store::VerifierStore;

/// The calling browser's Spotify session, read from its encrypted session cookie.
///
/// Rejects with `401` (`not_signed_in`, or `unauthorized` once the token has
/// expired) so each request only ever acts for the browser that logged in.
#[derive(Clone)]
pub(crate) struct SignedIn {
    pub(crate) access_token: String,
    pub(crate) expires_at: OffsetDateTime,
}

impl std::fmt::Debug for SignedIn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignedIn")
            .field("access_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl<V: VerifierStore, C: Classifier> FromRequestParts<ServerState<V, C>> for SignedIn {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ServerState<V, C>,
    ) -> Result<Self, Self::Rejection> {
        let jar: PrivateCookieJar = PrivateCookieJar::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError(Error::NotSignedIn))?;

        let (access_token, expires_at) =
            cookies::get_session(&jar, &state.settings.session_cookie_name)
                .ok_or(ApiError(Error::NotSignedIn))?;

        if OffsetDateTime::now_utc() >= expires_at {
            return Err(ApiError(Error::Unauthorized {
                operation: "session",
            }));
        }
        Ok(Self {
            access_token,
            expires_at,
        })
    }
}
