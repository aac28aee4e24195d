use serde::Deserialize;
use time::{Duration, OffsetDateTime};
use url::Url;

use crate::config::CuratorConfig;
use crate::error::Error;
use crate::pkce::CodeVerifier;
use crate::session::TokenPair;

/// Lifetime assumed when the token endpoint omits `expires_in`.
const DEFAULT_EXPIRES_IN: u64 = 3600;
/// Upper bound on a reported lifetime, so `expires_at` arithmetic cannot overflow.
const MAX_EXPIRES_IN: u64 = 365 * 24 * 3600;

/// `OAuth2` Authorization Code + PKCE client for the music service.
pub struct AuthClient {
    config: CuratorConfig,
    http: reqwest::Client,
}

/// Token response from the token endpoint.
#[derive(Debug, Clone, Deserialize)]
#[non_exhaustive]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

impl TokenResponse {
    fn into_token_pair(self, issued_at: OffsetDateTime) -> TokenPair {
        let lifetime = self
            .expires_in
            .unwrap_or(DEFAULT_EXPIRES_IN)
            .min(MAX_EXPIRES_IN);
        let expires_at = issued_at + Duration::seconds(i64::try_from(lifetime).unwrap_or_default());
        TokenPair::new(self.access_token, self.refresh_token, expires_at)
    }
}

impl AuthClient {
    #[must_use]
    pub fn new(config: CuratorConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    /// Use a custom HTTP client (for connection pool reuse, timeouts, or testing).
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    #[must_use]
    pub fn config(&self) -> &CuratorConfig {
        &self.config
    }

    /// Build the authorization URL for an S256 challenge.
    #[must_use]
    pub fn authorization_url(&self, code_challenge: &str) -> Url {
        let scope = self.config.scopes.join(" ");

        let mut url = self.config.auth_url.clone();
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.config.client_id)
            .append_pair("scope", &scope)
            .append_pair("code_challenge_method", "S256")
            .append_pair("code_challenge", code_challenge)
            .append_pair("redirect_uri", self.config.redirect_uri.as_str());
        url
    }

    /// [`authorization_url`](Self::authorization_url) plus an OAuth `state` the
    /// callback must echo back.
    #[must_use]
    pub fn authorization_url_with_state(&self, code_challenge: &str, state: &str) -> Url {
        let mut url = self.authorization_url(code_challenge);
        url.query_pairs_mut().append_pair("state", state);
        url
    }

    /// Exchange an authorization code for a token pair.
    ///
    /// Takes the verifier by value: it is spent whether or not the exchange succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TokenExchangeFailed`] on network failure, a non-2xx
    /// response, or an unreadable body. Never retried: the code is single-use.
    pub async fn exchange_code(
        &self,
        code: &str,
        code_verifier: CodeVerifier,
    ) -> Result<TokenPair, Error> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("client_id", self.config.client_id.as_str()),
            ("code_verifier", code_verifier.as_str()),
        ];

        let response = self
            .http
            .post(self.config.token_url.clone())
            .form(&params)
            .send()
            .await
            .map_err(|e| Error::TokenExchangeFailed {
                status: None,
                detail: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::TokenExchangeFailed {
                status: Some(status.as_u16()),
                detail: body,
            });
        }

        let token = response
            .json::<TokenResponse>()
            .await
            .map_err(|e| Error::TokenExchangeFailed {
                status: Some(status.as_u16()),
                detail: e.to_string(),
            })?;
        Ok(token.into_token_pair(OffsetDateTime::now_utc()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> CuratorConfig {
        CuratorConfig::new("test-client", "http://localhost:3000".parse().unwrap())
    }

    #[test]
    fn test_authorization_url_contains_pkce() {
        let client = AuthClient::new(test_config());
        let url = client.authorization_url("E9Melhoa2OwvFrEMTJguCHaoeK1zVj5uJpcx3NLaZHI");
        let pairs: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();

        assert_eq!(url.host_str(), Some("accounts.spotify.com"));
        assert_eq!(pairs["response_type"], "code");
        assert_eq!(pairs["client_id"], "test-client");
        assert_eq!(pairs["code_challenge_method"], "S256");
        assert_eq!(
            pairs["code_challenge"],
            "E9Melhoa2OwvFrEMTJguCHaoeK1zVj5uJpcx3NLaZHI"
        );
        assert_eq!(pairs["redirect_uri"], "http://localhost:3000/");
        assert!(pairs["scope"].contains("playlist-modify-private"));
        assert!(pairs["scope"].contains(' '));
        assert!(!pairs.contains_key("state"));
    }

    #[test]
    fn test_authorization_url_with_state() {
        let client = AuthClient::new(test_config());
        let url = client.authorization_url_with_state("challenge", "xyz");
        let pairs: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();

        assert_eq!(pairs["state"], "xyz");
        assert_eq!(pairs["code_challenge"], "challenge");
    }

    #[test]
    fn test_token_response_expiry() {
        let response: TokenResponse = serde_json::from_str(
            r#"{"access_token":"a","token_type":"Bearer","expires_in":60,"refresh_token":"r"}"#,
        )
        .unwrap();
        let issued = OffsetDateTime::UNIX_EPOCH;
        let pair = response.into_token_pair(issued);

        assert_eq!(pair.access_token(), "a");
        assert_eq!(pair.refresh_token(), Some("r"));
        assert_eq!(pair.expires_at(), issued + Duration::seconds(60));
    }

    #[test]
    fn test_token_response_default_expiry() {
        let response: TokenResponse =
            serde_json::from_str(r#"{"access_token":"a","token_type":"Bearer"}"#).unwrap();
        let issued = OffsetDateTime::UNIX_EPOCH;
        let pair = response.into_token_pair(issued);

        assert_eq!(pair.expires_at(), issued + Duration::hours(1));
        assert!(pair.refresh_token().is_none());
    }
}
