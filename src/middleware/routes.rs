use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Redirect;
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_extra::extract::PrivateCookieJar;
use serde::{Deserialize, Serialize};

use super::config::ServerConfig;
use super::cookies;
use super::error::ApiError;
use super::extractor::SignedIn;
use super::state::ServerState;
use crate::classify::Classifier;
use crate::curator::{Curator, Extraction, Selection};
use crate::error::Error;
use crate::pkce;
use crate::session::TokenPair;
use crate::types::{CreatedPlaylist, PlaylistSummary, UserIdentity};
use crate::verifier_store::VerifierStore;

/// Body of `POST {base}/extract`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractRequest {
    pub playlist: PlaylistSummary,
    pub description: String,
}

/// Body of `POST {base}/playlists`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRequest {
    pub name: String,
    pub selection: Selection,
}

/// Create the curator router.
pub fn curator_routes<V, C>(config: ServerConfig, curator: Arc<Curator<V, C>>) -> Router
where
    V: VerifierStore,
    C: Classifier,
{
    let base = config.settings.base_path.clone();

    let state = ServerState {
        curator,
        settings: config.settings,
    };

    Router::new()
        .route(&format!("{base}/login"), get(login::<V, C>))
        .route(&format!("{base}/callback"), get(callback::<V, C>))
        .route(
            &format!("{base}/logout"),
            get(logout::<V, C>).post(logout::<V, C>),
        )
        .route(&format!("{base}/me"), get(me::<V, C>))
        .route(
            &format!("{base}/playlists"),
            get(playlists::<V, C>).post(create_playlist::<V, C>),
        )
        .route(&format!("{base}/extract"), post(extract::<V, C>))
        .with_state(state)
}

// ── Login ──────────────────────────────────────────────────────────

async fn login<V: VerifierStore, C: Classifier>(
    State(state): State<ServerState<V, C>>,
    jar: PrivateCookieJar,
) -> Result<(PrivateCookieJar, Redirect), ApiError> {
    let auth = state.curator.auth_client();
    let pair = pkce::generate(auth.config().verifier_len())?;
    let csrf_state = pkce::generate_state()?;
    let url = auth.authorization_url_with_state(&pair.challenge, &csrf_state);

    let (pkce_cookie, state_cookie) = cookies::pkce_cookies(
        &pair.verifier,
        &csrf_state,
        state.settings.secure_cookies,
        &state.settings.base_path,
    );

    Ok((jar.add(pkce_cookie).add(state_cookie), Redirect::to(url.as_str())))
}

// ── Callback ───────────────────────────────────────────────────────

#[derive(Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

async fn callback<V: VerifierStore, C: Classifier>(
    State(state): State<ServerState<V, C>>,
    jar: PrivateCookieJar,
    Query(params): Query<CallbackParams>,
) -> (PrivateCookieJar, Redirect) {
    // The verifier and state are single-use: cleared whatever the outcome.
    let stored_state = cookies::get_state(&jar);
    let verifier = cookies::get_pkce_verifier(&jar);
    let (clear_pkce, clear_state) = cookies::clear_pkce_cookies(&state.settings.base_path);
    let jar = jar.add(clear_pkce).add(clear_state);

    match exchange(&state, params, stored_state, verifier).await {
        Ok(tokens) => {
            let session_cookie = cookies::session_cookie(
                &state.settings.session_cookie_name,
                &tokens,
                state.settings.secure_cookies,
            );
            tracing::info!(expires_at = %tokens.expires_at(), "Browser login successful");
            (
                jar.add(session_cookie),
                Redirect::to(&state.settings.login_redirect),
            )
        }
        Err(code) => (jar, login_error(&state.settings.error_redirect, code)),
    }
}

/// Validates the callback against the browser's cookies and exchanges the code.
/// Errors are the code reported to the error page.
async fn exchange<V: VerifierStore, C: Classifier>(
    state: &ServerState<V, C>,
    params: CallbackParams,
    stored_state: Option<String>,
    verifier: Option<pkce::CodeVerifier>,
) -> Result<TokenPair, &'static str> {
    if let Some(error) = &params.error {
        tracing::warn!(error = %error, "Authorization denied by provider");
        return Err(provider_error_code(error));
    }

    let code = params.code.ok_or("missing_code")?;

    let received_state = params.state.ok_or("state_mismatch")?;
    let stored_state = stored_state.ok_or("state_mismatch")?;
    if received_state != stored_state {
        tracing::warn!("OAuth state mismatch");
        return Err("state_mismatch");
    }

    let Some(verifier) = verifier else {
        tracing::warn!("No code verifier for callback; login must be restarted");
        return Err("missing_verifier");
    };

    state
        .curator
        .auth_client()
        .exchange_code(&code, verifier)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Token exchange failed");
            match e {
                Error::TokenExchangeFailed { .. } => "token_exchange_failed",
                _ => "login_failed",
            }
        })
}

/// Known OAuth error codes pass through; anything else is reported generically.
fn provider_error_code(error: &str) -> &'static str {
    match error {
        "access_denied" => "access_denied",
        "invalid_scope" => "invalid_scope",
        "server_error" => "server_error",
        "temporarily_unavailable" => "temporarily_unavailable",
        _ => "authorization_failed",
    }
}

// ── Logout ─────────────────────────────────────────────────────────

async fn logout<V: VerifierStore, C: Classifier>(
    State(state): State<ServerState<V, C>>,
    jar: PrivateCookieJar,
) -> (PrivateCookieJar, Redirect) {
    let clear_cookie = cookies::clear_session_cookie(&state.settings.session_cookie_name);
    (
        jar.remove(clear_cookie),
        Redirect::to(&state.settings.logout_redirect),
    )
}

// ── Library ────────────────────────────────────────────────────────

async fn me<V: VerifierStore, C: Classifier>(
    State(state): State<ServerState<V, C>>,
    user: SignedIn,
) -> Result<Json<UserIdentity>, ApiError> {
    Ok(Json(state.curator.fetch_identity(&user.access_token).await?))
}

async fn playlists<V: VerifierStore, C: Classifier>(
    State(state): State<ServerState<V, C>>,
    user: SignedIn,
) -> Result<Json<Vec<PlaylistSummary>>, ApiError> {
    Ok(Json(state.curator.list_playlists(&user.access_token).await?))
}

// ── Curation ───────────────────────────────────────────────────────

async fn extract<V: VerifierStore, C: Classifier>(
    State(state): State<ServerState<V, C>>,
    user: SignedIn,
    Json(body): Json<ExtractRequest>,
) -> Result<Json<Extraction>, ApiError> {
    let extraction = state
        .curator
        .extract_with_token(&user.access_token, &body.playlist, &body.description)
        .await?;
    Ok(Json(extraction))
}

async fn create_playlist<V: VerifierStore, C: Classifier>(
    State(state): State<ServerState<V, C>>,
    user: SignedIn,
    Json(body): Json<CreateRequest>,
) -> Result<(StatusCode, Json<CreatedPlaylist>), ApiError> {
    let created = state
        .curator
        .create_and_populate_with_token(&user.access_token, &body.name, body.selection)
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

// ── Helpers ────────────────────────────────────────────────────────

fn login_error(error_redirect: &str, code: &str) -> Redirect {
    let encoded = urlencoding::encode(code);
    Redirect::to(&format!("{error_redirect}?error={encoded}"))
}
