use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use crate::error::Error;

/// Checks HTTP response status; returns the response on success or the mapped error.
///
/// 401 is `Unauthorized`; 429 and 5xx are transient; any other non-2xx is `Rejected`.
pub(crate) async fn ensure_success(
    response: reqwest::Response,
    operation: &'static str,
) -> Result<reqwest::Response, Error> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let detail = response.text().await.unwrap_or_default();
    Err(status_error(status, operation, detail))
}

pub(crate) fn status_error(status: StatusCode, operation: &'static str, detail: String) -> Error {
    if status == StatusCode::UNAUTHORIZED {
        Error::Unauthorized { operation }
    } else if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        Error::TransientFetch {
            operation,
            status: Some(status.as_u16()),
            detail,
        }
    } else {
        Error::Rejected {
            operation,
            status: status.as_u16(),
            detail,
        }
    }
}

/// Transport failures (connect, timeout, body) are transient; decode failures are not.
pub(crate) fn transport_error(operation: &'static str) -> impl Fn(reqwest::Error) -> Error {
    move |e| {
        if e.is_decode() {
            Error::UnexpectedResponse {
                operation,
                detail: e.to_string(),
            }
        } else {
            Error::TransientFetch {
                operation,
                status: e.status().map(|s| s.as_u16()),
                detail: e.to_string(),
            }
        }
    }
}

/// Sends a request and decodes a successful JSON body.
pub(crate) async fn send_json<T: DeserializeOwned>(
    request: reqwest::RequestBuilder,
    operation: &'static str,
) -> Result<T, Error> {
    let response = request.send().await.map_err(transport_error(operation))?;
    let response = ensure_success(response, operation).await?;
    response.json::<T>().await.map_err(transport_error(operation))
}
