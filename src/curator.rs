use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{error, info, warn};
use url::Url;

use crate::assembly::{AssemblyJob, PlaylistAssembler};
use crate::classify::{self, Classification, ClassificationRequester, Classifier};
use crate::config::CuratorConfig;
use crate::error::Error;
use crate::library::LibraryClient;
use crate::oauth::AuthClient;
use crate::pkce;
use crate::session::{AuthSession, AuthState, TokenPair};
use crate::types::{CreatedPlaylist, PlaylistSummary, TrackId, TrackRef, UserIdentity};
use crate::verifier_store::VerifierStore;

/// Authorization URL to send the browser to, plus the attempt it belongs to.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct AuthorizationRequest {
    pub url: Url,
    pub session: AuthSession,
}

/// Tracks picked out of a source playlist, editable before assembly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct Selection {
    pub source_playlist: PlaylistSummary,
    pub description: String,
    pub candidate_tracks: Vec<TrackId>,
    pub tracks: Vec<TrackRef>,
}

impl Selection {
    /// Drop a track from the selection. Returns whether it was present.
    pub fn remove_track(&mut self, track_id: &TrackId) -> bool {
        let before = self.tracks.len();
        self.tracks.retain(|t| &t.track_id != track_id);
        self.tracks.len() != before
    }
}

/// Result of [`Curator::extract`]. `NoMatches` is an outcome, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Extraction {
    Matched(Selection),
    NoMatches {
        source_playlist: PlaylistSummary,
        description: String,
    },
}

#[derive(Default)]
struct SessionState {
    login: Option<AuthSession>,
    tokens: Option<TokenPair>,
    identity: Option<UserIdentity>,
}

/// The five operations a Playlist Curator UI drives, in order:
/// [`start_login`](Self::start_login), [`complete_login`](Self::complete_login),
/// [`list_playlists`](Self::list_playlists), [`extract`](Self::extract),
/// [`create_and_populate`](Self::create_and_populate).
///
/// Each stage awaits one remote call at a time. Errors are returned, never
/// swallowed; a failed assembly still reports the playlist it created.
pub struct Curator<V, C> {
    auth: AuthClient,
    library: LibraryClient,
    classifier: ClassificationRequester<C>,
    verifier_store: V,
    verifier_len: usize,
    session: RwLock<SessionState>,
}

impl<V: VerifierStore, C: Classifier> Curator<V, C> {
    pub fn new(config: CuratorConfig, verifier_store: V, classifier: C) -> Self {
        let http = reqwest::Client::new();
        Self {
            library: LibraryClient::new(config.api_base_url.clone()).with_http_client(http.clone()),
            verifier_len: config.verifier_len,
            auth: AuthClient::new(config).with_http_client(http),
            classifier: ClassificationRequester::new(classifier),
            verifier_store,
            session: RwLock::new(SessionState::default()),
        }
    }

    /// Use a custom HTTP client for the auth and library calls (timeouts, proxies).
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.auth = self.auth.with_http_client(client.clone());
        self.library = self.library.with_http_client(client);
        self
    }

    #[must_use]
    pub fn auth_client(&self) -> &AuthClient {
        &self.auth
    }

    #[must_use]
    pub fn library(&self) -> &LibraryClient {
        &self.library
    }

    #[must_use]
    pub fn verifier_store(&self) -> &V {
        &self.verifier_store
    }

    /// Begin a login: store a fresh verifier and build the authorization URL.
    ///
    /// Any previous attempt's verifier is replaced.
    ///
    /// # Errors
    ///
    /// [`Error::EntropySourceUnavailable`] (fatal) or a store failure.
    pub async fn start_login(&self) -> Result<AuthorizationRequest, Error> {
        let pair = pkce::generate(self.verifier_len)?;
        let url = self.auth.authorization_url(&pair.challenge);
        self.verifier_store.put(pair.verifier)?;

        let session = AuthSession::pending(pair.challenge);
        self.session.write().await.login = Some(session.clone());
        Ok(AuthorizationRequest { url, session })
    }

    /// Finish a login with the `code` from the redirect.
    ///
    /// The stored verifier is consumed before the exchange, so a replayed
    /// callback gets [`Error::MissingVerifier`] without touching the network.
    ///
    /// # Errors
    ///
    /// [`Error::MissingVerifier`] or [`Error::TokenExchangeFailed`]; both
    /// require restarting the login.
    pub async fn complete_login(&self, code: &str) -> Result<TokenPair, Error> {
        let Some(verifier) = self.verifier_store.take_once()? else {
            warn!("No code verifier for callback; login must be restarted");
            return Err(Error::MissingVerifier);
        };
        let challenge = verifier.challenge();

        let tokens = self
            .auth
            .exchange_code(code, verifier)
            .await
            .inspect_err(|e| error!(error = %e, "Token exchange failed"))?;

        let mut session = self.session.write().await;
        session.login = Some(AuthSession {
            challenge,
            state: AuthState::Exchanged,
        });
        session.tokens = Some(tokens.clone());
        session.identity = None;
        info!(expires_at = %tokens.expires_at(), "Login successful");
        Ok(tokens)
    }

    /// State of the current login attempt, if any.
    pub async fn auth_state(&self) -> Option<AuthState> {
        let session = self.session.read().await;
        let login = session.login.as_ref()?;
        match (&login.state, &session.tokens) {
            (AuthState::Exchanged, Some(tokens)) if tokens.is_expired() => Some(AuthState::Expired),
            (state, _) => Some(*state),
        }
    }

    /// Access token of the current session.
    ///
    /// # Errors
    ///
    /// [`Error::NotSignedIn`] before a login completes; [`Error::Unauthorized`]
    /// once the token has expired (login must be restarted).
    pub async fn access_token(&self) -> Result<String, Error> {
        let session = self.session.read().await;
        let tokens = session.tokens.as_ref().ok_or(Error::NotSignedIn)?;
        if tokens.is_expired() {
            return Err(Error::Unauthorized { operation: "session" });
        }
        Ok(tokens.access_token().to_string())
    }

    /// Identity for an explicit token. Idempotent read.
    ///
    /// # Errors
    ///
    /// See [`LibraryClient::fetch_identity`].
    pub async fn fetch_identity(&self, access_token: &str) -> Result<UserIdentity, Error> {
        self.library.fetch_identity(access_token).await
    }

    /// Identity of the current session, fetched once and then cached.
    ///
    /// # Errors
    ///
    /// See [`access_token`](Self::access_token) and [`LibraryClient::fetch_identity`].
    pub async fn identity(&self) -> Result<UserIdentity, Error> {
        if let Some(identity) = self.session.read().await.identity.clone() {
            return Ok(identity);
        }
        let token = self.access_token().await?;
        let identity = self.library.fetch_identity(&token).await?;
        self.session.write().await.identity = Some(identity.clone());
        Ok(identity)
    }

    /// Every playlist of the user, all pages, in server order.
    ///
    /// # Errors
    ///
    /// See [`LibraryClient::list_playlists`].
    pub async fn list_playlists(&self, access_token: &str) -> Result<Vec<PlaylistSummary>, Error> {
        self.library.list_playlists(access_token).await
    }

    /// Classify the tracks of `playlist` against `description`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidDescription`] before any network call; otherwise the
    /// failing read or classification error.
    pub async fn extract(
        &self,
        playlist: &PlaylistSummary,
        description: &str,
    ) -> Result<Extraction, Error> {
        classify::validate_description(description)?;
        let token = self.access_token().await?;
        self.extract_with_token(&token, playlist, description).await
    }

    /// [`extract`](Self::extract) for an explicit token instead of the session's.
    ///
    /// # Errors
    ///
    /// See [`extract`](Self::extract).
    pub async fn extract_with_token(
        &self,
        access_token: &str,
        playlist: &PlaylistSummary,
        description: &str,
    ) -> Result<Extraction, Error> {
        let description = classify::validate_description(description)?.to_string();

        let candidates = self
            .library
            .playlist_track_ids(access_token, &playlist.id)
            .await?;

        let matched = match self.classifier.classify(&description, &candidates).await? {
            Classification::Matched(ids) => self.library.fetch_tracks(access_token, &ids).await?,
            Classification::NoMatches => Vec::new(),
        };

        if matched.is_empty() {
            warn!(
                playlist = %playlist.id,
                candidates = candidates.len(),
                "No tracks matched description"
            );
            return Ok(Extraction::NoMatches {
                source_playlist: playlist.clone(),
                description,
            });
        }

        info!(
            playlist = %playlist.id,
            candidates = candidates.len(),
            matched = matched.len(),
            "Extracted tracks"
        );
        Ok(Extraction::Matched(Selection {
            source_playlist: playlist.clone(),
            description,
            candidate_tracks: candidates,
            tracks: matched,
        }))
    }

    /// Create a playlist named `name` holding `selection`'s tracks in order.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidPlaylistName`] / [`Error::EmptySelection`] before any
    /// call; [`Error::AssemblyFailed`] once a remote step fails, carrying the
    /// created playlist if there is one.
    pub async fn create_and_populate(
        &self,
        name: &str,
        selection: Selection,
    ) -> Result<CreatedPlaylist, Error> {
        let mut job = Self::job(name, selection)?;
        self.assemble(&mut job).await
    }

    /// [`create_and_populate`](Self::create_and_populate) for an explicit token.
    ///
    /// # Errors
    ///
    /// See [`create_and_populate`](Self::create_and_populate).
    pub async fn create_and_populate_with_token(
        &self,
        access_token: &str,
        name: &str,
        selection: Selection,
    ) -> Result<CreatedPlaylist, Error> {
        let mut job = Self::job(name, selection)?;
        let identity = self.library.fetch_identity(access_token).await?;
        PlaylistAssembler::new(&self.library, access_token, &identity.user_id)
            .run(&mut job)
            .await
    }

    /// Run or resume an assembly job, keeping its state in the caller's hands.
    ///
    /// # Errors
    ///
    /// See [`PlaylistAssembler::run`].
    pub async fn assemble(&self, job: &mut AssemblyJob) -> Result<CreatedPlaylist, Error> {
        let token = self.access_token().await?;
        let identity = self.identity().await?;
        PlaylistAssembler::new(&self.library, &token, &identity.user_id)
            .run(job)
            .await
    }

    fn job(name: &str, selection: Selection) -> Result<AssemblyJob, Error> {
        AssemblyJob::new(
            name,
            selection.description,
            selection.source_playlist,
            selection.candidate_tracks,
            selection.tracks,
        )
    }
}
