//! HTTP clients for the remote registries.
//!
//! Clients make exactly one request per call. Retrying is the
//! orchestrator's decision, so nothing here loops. Every failure is mapped
//! to [`ConnectorError`]: transport problems, timeouts, 5xx and 429 are
//! `Unreachable`; any other non-2xx is `Rejected` with the provider's
//! message attached.

mod dark;
mod doi;

use std::time::Duration;

use reqwest::{header, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::connector::{ConnectorError, ConnectorResult};

pub use dark::{DarkClient, DarkClientConfig};
pub(crate) use doi::DoiEvent;
pub use doi::{DoiClient, DoiClientConfig, DoiState};

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// `User-Agent` sent on every request.
pub const USER_AGENT: &str = concat!("pidreg/", env!("CARGO_PKG_VERSION"));

pub(crate) fn build_http_client(timeout: Duration) -> ConnectorResult<reqwest::Client> {
    let mut headers = header::HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("application/json"),
    );

    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .default_headers(headers)
        .build()
        .map_err(|e| ConnectorError::Unreachable(format!("failed to build HTTP client: {e}")))
}

/// Maps a transport error (no response at all).
pub(crate) fn transport_error(url: &str, err: reqwest::Error) -> ConnectorError {
    let kind = if err.is_timeout() {
        "timed out"
    } else if err.is_connect() {
        "connection failed"
    } else {
        "request failed"
    };
    ConnectorError::Unreachable(format!("{kind}: {url}: {err}"))
}

/// Passes 2xx responses through and maps the rest.
pub(crate) async fn check_status(url: &str, response: Response) -> ConnectorResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    warn!(url = %url, status = %status, body = %body, "Registry returned an error");
    Err(status_error(status, &body))
}

pub(crate) fn status_error(status: StatusCode, body: &str) -> ConnectorError {
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        ConnectorError::Unreachable(format!("{status}: {}", rejection_message(body)))
    } else {
        ConnectorError::Rejected {
            status: status.as_u16(),
            message: rejection_message(body),
        }
    }
}

/// Reads a JSON body. An unreadable or non-JSON 2xx body is `Unreachable`:
/// the request may have been applied, so it has to be retried.
pub(crate) async fn read_json<T: DeserializeOwned>(
    url: &str,
    response: Response,
) -> ConnectorResult<T> {
    let text = response
        .text()
        .await
        .map_err(|e| ConnectorError::Unreachable(format!("failed to read body from {url}: {e}")))?;
    serde_json::from_str(&text)
        .map_err(|e| ConnectorError::Unreachable(format!("malformed response from {url}: {e}")))
}

/// Best-effort human message from an error body.
///
/// Understands JSON:API `errors[].title`/`detail` and a top-level
/// `message`/`error`; otherwise returns the trimmed body.
pub(crate) fn rejection_message(body: &str) -> String {
    let Ok(json) = serde_json::from_str::<serde_json::Value>(body) else {
        return body.trim().to_string();
    };

    if let Some(errors) = json.get("errors").and_then(|e| e.as_array()) {
        let titles: Vec<&str> = errors
            .iter()
            .filter_map(|e| {
                e.get("title")
                    .or_else(|| e.get("detail"))
                    .and_then(|t| t.as_str())
            })
            .collect();
        if !titles.is_empty() {
            return titles.join("; ");
        }
    }

    ["message", "error"]
        .iter()
        .find_map(|key| json.get(*key).and_then(|v| v.as_str()))
        .map(str::to_string)
        .unwrap_or_else(|| body.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            status_error(StatusCode::SERVICE_UNAVAILABLE, ""),
            ConnectorError::Unreachable(_)
        ));
        assert!(matches!(
            status_error(StatusCode::TOO_MANY_REQUESTS, ""),
            ConnectorError::Unreachable(_)
        ));
        assert!(matches!(
            status_error(StatusCode::UNPROCESSABLE_ENTITY, "nope"),
            ConnectorError::Rejected { status: 422, ref message } if message == "nope"
        ));
    }

    #[test]
    fn test_rejection_message_formats() {
        assert_eq!(
            rejection_message(r#"{"errors":[{"status":"422","title":"Doi already taken"}]}"#),
            "Doi already taken"
        );
        assert_eq!(rejection_message(r#"{"message":"bad ark"}"#), "bad ark");
        assert_eq!(rejection_message("  plain failure \n"), "plain failure");
        assert_eq!(rejection_message(r#"{"other":1}"#), r#"{"other":1}"#);
    }

    #[test]
    fn test_user_agent_carries_version() {
        assert!(USER_AGENT.starts_with("pidreg/"));
    }
}
