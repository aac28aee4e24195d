use url::Url;

use crate::error::Error;
use crate::pkce::{self, DEFAULT_VERIFIER_LEN};

const DEFAULT_AUTH_URL: &str = "https://accounts.spotify.com/authorize";
const DEFAULT_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const DEFAULT_API_URL: &str = "https://api.spotify.com/v1/";
const DEFAULT_CLASSIFIER_URL: &str = "http://localhost:8000/api/classify/";
const DEFAULT_SCOPES: &[&str] = &[
    "user-read-private",
    "user-read-email",
    "playlist-read-private",
    "playlist-modify-public",
    "playlist-modify-private",
];

/// Playlist Curator configuration.
///
/// Required fields are constructor parameters; there is no runtime "missing field" error.
///
/// ```rust,ignore
/// use playlist_curator::CuratorConfig;
///
/// let config = CuratorConfig::new("my-client-id", "http://localhost:3000".parse()?)
///     .with_classifier_url("http://classifier.internal/api/classify/".parse()?);
/// ```
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct CuratorConfig {
    pub(crate) client_id: String,
    pub(crate) redirect_uri: Url,
    pub(crate) auth_url: Url,
    pub(crate) token_url: Url,
    pub(crate) api_base_url: Url,
    pub(crate) classifier_url: Url,
    pub(crate) scopes: Vec<String>,
    pub(crate) verifier_len: usize,
}

impl CuratorConfig {
    /// Create a configuration pointing at the public Spotify endpoints.
    #[must_use]
    pub fn new(client_id: impl Into<String>, redirect_uri: Url) -> Self {
        Self {
            client_id: client_id.into(),
            redirect_uri,
            auth_url: DEFAULT_AUTH_URL.parse().expect("valid default URL"),
            token_url: DEFAULT_TOKEN_URL.parse().expect("valid default URL"),
            api_base_url: DEFAULT_API_URL.parse().expect("valid default URL"),
            classifier_url: DEFAULT_CLASSIFIER_URL.parse().expect("valid default URL"),
            scopes: DEFAULT_SCOPES.iter().map(|s| (*s).to_string()).collect(),
            verifier_len: DEFAULT_VERIFIER_LEN,
        }
    }

    /// Create configuration from environment variables.
    ///
    /// # Required env vars
    /// - `CURATOR_CLIENT_ID`: OAuth2 client ID
    /// - `CURATOR_REDIRECT_URI`: OAuth2 callback URI (must be a valid URL)
    ///
    /// # Optional env vars
    /// - `CURATOR_AUTH_URL`: Override the authorize endpoint
    /// - `CURATOR_TOKEN_URL`: Override the token endpoint
    /// - `CURATOR_API_URL`: Override the Web API base URL
    /// - `CURATOR_CLASSIFIER_URL`: Override the classification service URL
    /// - `CURATOR_SCOPES`: Comma-separated OAuth2 scopes
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if required env vars are missing or URLs are invalid.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let client_id = lookup("CURATOR_CLIENT_ID")
            .ok_or_else(|| Error::Config("CURATOR_CLIENT_ID is required".into()))?;
        let redirect_uri = lookup("CURATOR_REDIRECT_URI")
            .ok_or_else(|| Error::Config("CURATOR_REDIRECT_URI is required".into()))
            .and_then(|s| parse_url("CURATOR_REDIRECT_URI", &s))?;

        let mut config = Self::new(client_id, redirect_uri);

        if let Some(s) = lookup("CURATOR_AUTH_URL") {
            config = config.with_auth_url(parse_url("CURATOR_AUTH_URL", &s)?);
        }
        if let Some(s) = lookup("CURATOR_TOKEN_URL") {
            config = config.with_token_url(parse_url("CURATOR_TOKEN_URL", &s)?);
        }
        if let Some(s) = lookup("CURATOR_API_URL") {
            config = config.with_api_base_url(parse_url("CURATOR_API_URL", &s)?);
        }
        if let Some(s) = lookup("CURATOR_CLASSIFIER_URL") {
            config = config.with_classifier_url(parse_url("CURATOR_CLASSIFIER_URL", &s)?);
        }
        if let Some(scopes) = lookup("CURATOR_SCOPES") {
            config = config.with_scopes(
                scopes
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(ToString::to_string)
                    .collect(),
            );
        }

        Ok(config)
    }

    /// Override the authorization endpoint.
    #[must_use]
    pub fn with_auth_url(mut self, url: Url) -> Self {
        self.auth_url = url;
        self
    }

    /// Override the token endpoint.
    #[must_use]
    pub fn with_token_url(mut self, url: Url) -> Self {
        self.token_url = url;
        self
    }

    /// Override the Web API base URL. A trailing `/` is added if missing so
    /// relative endpoints join beneath it.
    #[must_use]
    pub fn with_api_base_url(mut self, mut url: Url) -> Self {
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        self.api_base_url = url;
        self
    }

    /// Override the classification service endpoint.
    #[must_use]
    pub fn with_classifier_url(mut self, url: Url) -> Self {
        self.classifier_url = url;
        self
    }

    /// Override the OAuth2 scopes.
    #[must_use]
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Override the PKCE verifier length.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidVerifierLength`] outside `43..=128`.
    pub fn with_verifier_len(mut self, len: usize) -> Result<Self, Error> {
        if !(pkce::MIN_VERIFIER_LEN..=pkce::MAX_VERIFIER_LEN).contains(&len) {
            return Err(Error::InvalidVerifierLength(len));
        }
        self.verifier_len = len;
        Ok(self)
    }

    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    #[must_use]
    pub fn redirect_uri(&self) -> &Url {
        &self.redirect_uri
    }

    #[must_use]
    pub fn auth_url(&self) -> &Url {
        &self.auth_url
    }

    #[must_use]
    pub fn token_url(&self) -> &Url {
        &self.token_url
    }

    #[must_use]
    pub fn api_base_url(&self) -> &Url {
        &self.api_base_url
    }

    #[must_use]
    pub fn classifier_url(&self) -> &Url {
        &self.classifier_url
    }

    #[must_use]
    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    #[must_use]
    pub fn verifier_len(&self) -> usize {
        self.verifier_len
    }
}

fn parse_url(var: &str, value: &str) -> Result<Url, Error> {
    value
        .parse()
        .map_err(|e| Error::Config(format!("{var}: {e}")))
}
