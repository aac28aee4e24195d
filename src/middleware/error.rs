use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::error::Error;

/// [`Error`] rendered as a JSON response.
///
/// The body is `{"error": <code>, "message": <text>}`; a failed assembly also
/// carries `stage` and the `playlist` left on the account.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            Error::InvalidDescription(_)
            | Error::InvalidPlaylistName
            | Error::EmptySelection
            | Error::InvalidVerifierLength(_) => StatusCode::BAD_REQUEST,
            Error::NotSignedIn | Error::Unauthorized { .. } | Error::MissingVerifier => {
                StatusCode::UNAUTHORIZED
            }
            Error::TransientFetch { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Error::TokenExchangeFailed { .. }
            | Error::Rejected { .. }
            | Error::UnexpectedResponse { .. }
            | Error::AssemblyFailed { .. } => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match &self.0 {
            Error::InvalidDescription(_) => "invalid_description",
            Error::InvalidPlaylistName => "invalid_playlist_name",
            Error::EmptySelection => "empty_selection",
            Error::InvalidVerifierLength(_) => "invalid_verifier_length",
            Error::NotSignedIn => "not_signed_in",
            Error::Unauthorized { .. } => "unauthorized",
            Error::MissingVerifier => "missing_verifier",
            Error::TransientFetch { .. } => "transient_failure",
            Error::TokenExchangeFailed { .. } => "token_exchange_failed",
            Error::Rejected { .. } => "rejected",
            Error::UnexpectedResponse { .. } => "unexpected_response",
            Error::AssemblyFailed { .. } => "assembly_failed",
            _ => "internal",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self.0, "Curator internal error");
            return (status, Json(json!({ "error": code, "message": "Internal error" })))
                .into_response();
        }

        let mut body = json!({ "error": code, "message": self.0.to_string() });
        if let Error::AssemblyFailed {
            stage, playlist, ..
        } = &self.0
        {
            body["stage"] = json!(stage);
            body["playlist"] = json!(playlist);
        }
        (status, Json(body)).into_response()
    }
}
