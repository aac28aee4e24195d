#![doc = include_str!("../README.md")]

pub mod assembly;
pub mod classify;
pub mod config;
pub mod curator;
pub mod error;
mod http;
pub mod library;
#[cfg(feature = "server")]
pub mod middleware;
pub mod oauth;
pub mod pkce;
pub mod session;
pub mod types;
pub mod verifier_store;

// Re-exports for convenient access
pub use assembly::{AssemblyJob, AssemblyStage, AssemblyStep, PlaylistAssembler};
pub use classify::{
    Classification, ClassificationRequester, Classifier, HttpClassifier, MAX_DESCRIPTION_LEN,
};
pub use config::CuratorConfig;
pub use curator::{AuthorizationRequest, Curator, Extraction, Selection};
pub use error::Error;
pub use library::LibraryClient;
pub use oauth::{AuthClient, TokenResponse};
pub use pkce::{CodeVerifier, PkcePair, generate_code_challenge};
pub use session::{AuthSession, AuthState, TokenPair};
pub use types::{
    CreatedPlaylist, PlaylistId, PlaylistSummary, TrackId, TrackRef, UserId, UserIdentity,
};
pub use verifier_store::{FileVerifierStore, MemoryVerifierStore, VerifierStore};
