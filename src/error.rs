use crate::assembly::AssemblyStep;
use crate::types::CreatedPlaylist;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The OS randomness source failed. Fatal: never retried.
    #[error("secure entropy source unavailable: {0}")]
    EntropySourceUnavailable(String),

    #[error("code verifier length {0} is outside 43..=128")]
    InvalidVerifierLength(usize),

    /// No verifier was stored for this login attempt, or it was already consumed.
    #[error("no code verifier for this login attempt, login must be restarted")]
    MissingVerifier,

    /// Authorization codes are single-use, so this is surfaced and never retried.
    #[error("token exchange failed{}: {detail}", status_suffix(.status))]
    TokenExchangeFailed { status: Option<u16>, detail: String },

    #[error("unauthorized during {operation}")]
    Unauthorized { operation: &'static str },

    /// Network failure, timeout, 429 or 5xx. Idempotent reads may be retried by the caller.
    #[error("transient failure during {operation}{}: {detail}", status_suffix(.status))]
    TransientFetch {
        operation: &'static str,
        status: Option<u16>,
        detail: String,
    },

    #[error("{operation} rejected ({status}): {detail}")]
    Rejected {
        operation: &'static str,
        status: u16,
        detail: String,
    },

    #[error("unexpected response from {operation}: {detail}")]
    UnexpectedResponse {
        operation: &'static str,
        detail: String,
    },

    #[error("invalid description: {0}")]
    InvalidDescription(String),

    #[error("playlist name cannot be empty")]
    InvalidPlaylistName,

    #[error("no tracks selected")]
    EmptySelection,

    #[error("not signed in")]
    NotSignedIn,

    /// Assembly stopped at `stage`. `playlist` is set when the playlist was
    /// already created and still exists on the account.
    #[error("playlist assembly failed at {stage}: {source}")]
    AssemblyFailed {
        stage: AssemblyStep,
        playlist: Option<CreatedPlaylist>,
        #[source]
        source: Box<Error>,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("verifier store error: {0}")]
    Store(String),
}

impl Error {
    /// Whether re-issuing the same idempotent call could succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransientFetch { .. })
    }

    /// The playlist left behind by a failed assembly, if any.
    #[must_use]
    pub fn partial_playlist(&self) -> Option<&CreatedPlaylist> {
        match self {
            Self::AssemblyFailed { playlist, .. } => playlist.as_ref(),
            _ => None,
        }
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" ({s})")).unwrap_or_default()
}
