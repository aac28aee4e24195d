//! Axum routes exposing the curator pipeline to a browser UI.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use playlist_curator::middleware::{ServerConfig, curator_routes};
//! use playlist_curator::{Curator, CuratorConfig, HttpClassifier, MemoryVerifierStore};
//!
//! let config = CuratorConfig::from_env()?;
//! let classifier = HttpClassifier::new(config.classifier_url().clone());
//! let curator = Arc::new(Curator::new(config, MemoryVerifierStore::new(), classifier));
//!
//! let app = axum::Router::new()
//!     .merge(curator_routes(ServerConfig::from_env()?, curator));
//! ```
//!
//! Each browser holds its own login. `/login` puts the PKCE verifier and a
//! random OAuth `state` in encrypted, short-lived cookies; `/callback` only
//! exchanges the code when the returned `state` matches, then stores the
//! access token in an encrypted session cookie. Library routes act for the
//! browser that sent the cookie and answer `401` without one.
//!
//! Routes, relative to the base path (default `/api`):
//!
//! | Method   | Path         | Purpose                                       |
//! |----------|--------------|-----------------------------------------------|
//! | GET      | `/login`     | redirect to the authorization page            |
//! | GET      | `/callback`  | OAuth redirect target; completes the login    |
//! | GET/POST | `/logout`    | drop the session cookie                       |
//! | GET      | `/me`        | signed-in identity                            |
//! | GET      | `/playlists` | every playlist of the user                    |
//! | POST     | `/extract`   | classify a playlist against a description     |
//! | POST     | `/playlists` | create and populate the curated playlist      |

mod config;
mod cookies;
mod error;
mod extractor;
mod routes;
mod state;

pub use config::ServerConfig;
pub use error::ApiError;
pub use routes::{CreateRequest, ExtractRequest, curator_routes};
