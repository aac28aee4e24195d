use axum_extra::extract::cookie::Key;

use crate::error::Error;

/// Cookie and path settings shared by config and runtime state.
#[derive(Clone)]
pub(crate) struct ServerSettings {
    pub(crate) cookie_key: Key,
    pub(crate) session_cookie_name: String,
    pub(crate) secure_cookies: bool,
    pub(crate) base_path: String,
    pub(crate) login_redirect: String,
    pub(crate) logout_redirect: String,
    pub(crate) error_redirect: String,
}

impl ServerSettings {
    fn defaults() -> Self {
        Self {
            cookie_key: Key::generate(),
            session_cookie_name: "__curator_session".into(),
            secure_cookies: true,
            base_path: "/api".into(),
            login_redirect: "/".into(),
            logout_redirect: "/".into(),
            error_redirect: "/login".into(),
        }
    }
}

/// Route configuration for [`curator_routes`](super::curator_routes).
///
/// Every browser gets its own login: the PKCE verifier, the OAuth `state` and
/// the access token travel in cookies encrypted with the cookie key.
///
/// Use [`from_env()`](ServerConfig::from_env) for convention-based setup,
/// or [`new()`](ServerConfig::new) with `with_*` methods for full control.
pub struct ServerConfig {
    pub(super) settings: ServerSettings,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerConfig {
    /// Defaults: routes under `/api`, back to `/` after login, `/login` on
    /// error, secure cookies and an ephemeral cookie key.
    #[must_use]
    pub fn new() -> Self {
        Self {
            settings: ServerSettings::defaults(),
        }
    }

    /// Create config from environment variables.
    ///
    /// # Optional env vars
    /// - `CURATOR_BASE_PATH`: Mount point of the routes (must start with `/`)
    /// - `CURATOR_LOGIN_REDIRECT`: Where the browser goes after a successful login
    /// - `CURATOR_LOGOUT_REDIRECT`: Where the browser goes after logout
    /// - `CURATOR_ERROR_REDIRECT`: Where the browser goes when login fails
    /// - `CURATOR_COOKIE_KEY`: Cookie encryption key bytes (at least 64)
    /// - `CURATOR_DEV`: Set to `"1"` or `"true"` to allow cookies over plain HTTP
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `CURATOR_BASE_PATH` is not an absolute path
    /// or `CURATOR_COOKIE_KEY` is too short.
    pub fn from_env() -> Result<Self, Error> {
        let mut config = Self::new();
        if let Ok(path) = std::env::var("CURATOR_BASE_PATH") {
            if !path.starts_with('/') {
                return Err(Error::Config(format!(
                    "CURATOR_BASE_PATH must start with '/': {path}"
                )));
            }
            config = config.with_base_path(path);
        }
        if let Ok(path) = std::env::var("CURATOR_LOGIN_REDIRECT") {
            config = config.with_login_redirect(path);
        }
        if let Ok(path) = std::env::var("CURATOR_LOGOUT_REDIRECT") {
            config = config.with_logout_redirect(path);
        }
        if let Ok(path) = std::env::var("CURATOR_ERROR_REDIRECT") {
            config = config.with_error_redirect(path);
        }
        if let Ok(key) = std::env::var("CURATOR_COOKIE_KEY") {
            let key = Key::try_from(key.as_bytes()).map_err(|_| {
                Error::Config(
                    "CURATOR_COOKIE_KEY is set but invalid (must be at least 64 bytes). \
                     Remove the env var to use an ephemeral key, or provide a valid key."
                        .into(),
                )
            })?;
            config = config.with_cookie_key(key);
        }

        let dev = matches!(
            std::env::var("CURATOR_DEV").as_deref(),
            Ok("1") | Ok("true"),
        );
        Ok(config.with_secure_cookies(!dev))
    }

    #[must_use]
    pub fn with_cookie_key(mut self, key: Key) -> Self {
        self.settings.cookie_key = key;
        self
    }

    #[must_use]
    pub fn with_session_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.settings.session_cookie_name = name.into();
        self
    }

    #[must_use]
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.settings.secure_cookies = secure;
        self
    }

    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<String>) -> Self {
        let path = path.into();
        self.settings.base_path = path.trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn with_login_redirect(mut self, path: impl Into<String>) -> Self {
        self.settings.login_redirect = path.into();
        self
    }

    #[must_use]
    pub fn with_logout_redirect(mut self, path: impl Into<String>) -> Self {
        self.settings.logout_redirect = path.into();
        self
    }

    #[must_use]
    pub fn with_error_redirect(mut self, path: impl Into<String>) -> Self {
        self.settings.error_redirect = path.into();
        self
    }
}
