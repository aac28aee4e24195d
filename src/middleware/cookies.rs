use axum_extra::extract::PrivateCookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use time::{Duration, OffsetDateTime};

use crate::pkce::CodeVerifier;
use crate::session::TokenPair;

const PKCE_COOKIE_NAME: &str = "__curator_pkce";
const STATE_COOKIE_NAME: &str = "__curator_state";

/// Routes mounted at the root still need a non-empty cookie path.
fn cookie_path(base_path: &str) -> String {
    if base_path.is_empty() {
        "/".to_string()
    } else {
        base_path.to_string()
    }
}

/// Create PKCE verifier + state cookies for the authorization request.
pub(super) fn pkce_cookies(
    code_verifier: &CodeVerifier,
    state: &str,
    secure: bool,
    base_path: &str,
) -> (Cookie<'static>, Cookie<'static>) {
    let verifier = Cookie::build((PKCE_COOKIE_NAME, code_verifier.as_str().to_string()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path(cookie_path(base_path))
        .max_age(Duration::minutes(5))
        .build();

    let state = Cookie::build((STATE_COOKIE_NAME, state.to_string()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path(cookie_path(base_path))
        .max_age(Duration::minutes(5))
        .build();

    (verifier, state)
}

/// Create removal cookies for PKCE verifier + state.
pub(super) fn clear_pkce_cookies(base_path: &str) -> (Cookie<'static>, Cookie<'static>) {
    let verifier = Cookie::build((PKCE_COOKIE_NAME, ""))
        .path(cookie_path(base_path))
        .max_age(Duration::ZERO)
        .build();

    let state = Cookie::build((STATE_COOKIE_NAME, ""))
        .path(cookie_path(base_path))
        .max_age(Duration::ZERO)
        .build();

    (verifier, state)
}

/// Session cookie carrying the access token until it expires.
///
/// Value is `{expires_at unix seconds}:{access token}`; the jar encrypts it.
pub(super) fn session_cookie(name: &str, tokens: &TokenPair, secure: bool) -> Cookie<'static> {
    let remaining = (tokens.expires_at() - OffsetDateTime::now_utc()).max(Duration::ZERO);
    let value = format!(
        "{}:{}",
        tokens.expires_at().unix_timestamp(),
        tokens.access_token()
    );
    Cookie::build((name.to_string(), value))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/".to_string())
        .max_age(remaining)
        .build()
}

/// Create removal cookie for session.
pub(super) fn clear_session_cookie(name: &str) -> Cookie<'static> {
    Cookie::build((name.to_string(), ""))
        .path("/".to_string())
        .max_age(Duration::ZERO)
        .build()
}

/// Access token and expiry from the session cookie, if present and well-formed.
pub(super) fn get_session(
    jar: &PrivateCookieJar,
    name: &str,
) -> Option<(String, OffsetDateTime)> {
    let cookie = jar.get(name)?;
    let (expires_at, token) = cookie.value().split_once(':')?;
    let expires_at = OffsetDateTime::from_unix_timestamp(expires_at.parse().ok()?).ok()?;
    if token.is_empty() {
        return None;
    }
    Some((token.to_string(), expires_at))
}

/// Get the PKCE verifier from cookies.
pub(super) fn get_pkce_verifier(jar: &PrivateCookieJar) -> Option<CodeVerifier> {
    jar.get(PKCE_COOKIE_NAME).map(|c| CodeVerifier::from(c.value().to_string()))
}

/// Get the state from cookies.
pub(super) fn get_state(jar: &PrivateCookieJar) -> Option<String> {
    jar.get(STATE_COOKIE_NAME).map(|c| c.value().to_string())
}
