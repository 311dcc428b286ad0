//! Client for the dArk identifier service.
//!
//! The service has three calls, all `POST` with JSON bodies:
//! - `/core/new` mints a suffix: `{}` -> `{"ark": "<suffix>"}`
//! - `/core/set/{prefix}/{suffix}` with `{"payload": {...}}` stores metadata
//! - the same path with `{"external_url": "..."}` stores the landing page

use std::time::Duration;

use pidreg_id::IdentifierValue;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{build_http_client, check_status, read_json, transport_error, DEFAULT_TIMEOUT};
use crate::connector::{ConnectorError, ConnectorResult};
use crate::payload::RegistrationPayload;

/// Connection settings for [`DarkClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DarkClientConfig {
    pub base_url: String,
    /// Project prefix used in `/core/set/{prefix}/...` paths.
    pub repo_prefix: String,
    pub timeout: Duration,
}

impl DarkClientConfig {
    pub fn new(base_url: impl Into<String>, repo_prefix: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            repo_prefix: repo_prefix.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

#[derive(Debug, Deserialize)]
struct NewArkResponse {
    ark: String,
}

#[derive(Debug, Serialize)]
struct MetadataBody<'a> {
    payload: MetadataFields<'a>,
}

#[derive(Debug, Serialize)]
struct MetadataFields<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    author: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    year: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<&'a str>,
    #[serde(rename = "darkId")]
    dark_id: &'a str,
}

#[derive(Debug, Serialize)]
struct ExternalUrlBody<'a> {
    external_url: &'a str,
}

/// HTTP client for one dArk service.
pub struct DarkClient {
    client: reqwest::Client,
    base_url: String,
    repo_prefix: String,
}

impl DarkClient {
    pub fn new(config: &DarkClientConfig) -> ConnectorResult<Self> {
        Ok(Self {
            client: build_http_client(config.timeout)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            repo_prefix: config.repo_prefix.clone(),
        })
    }

    pub fn repo_prefix(&self) -> &str {
        &self.repo_prefix
    }

    /// Asks the service for a fresh suffix.
    pub async fn create_new(&self) -> ConnectorResult<String> {
        let url = format!("{}/core/new", self.base_url);
        debug!(url = %url, "Requesting new ark");

        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(|e| transport_error(&url, e))?;
        let response = check_status(&url, response).await?;
        let body: NewArkResponse = read_json(&url, response).await?;

        if body.ark.trim().is_empty() {
            return Err(ConnectorError::Unreachable(format!(
                "empty ark in response from {url}"
            )));
        }

        info!(ark = %body.ark, "Minted ark");
        Ok(body.ark)
    }

    /// Sends the metadata payload for `payload.identifier`.
    pub async fn set_metadata(&self, payload: &RegistrationPayload) -> ConnectorResult<()> {
        let body = MetadataBody {
            payload: MetadataFields {
                author: payload.author.as_deref(),
                title: payload.title.as_deref(),
                year: payload.year.as_deref(),
                url: payload.url.as_deref(),
                dark_id: payload.identifier.as_str(),
            },
        };
        self.post_set(&payload.identifier, &body).await
    }

    /// Sends the public landing page for `value`.
    pub async fn set_external_url(
        &self,
        value: &IdentifierValue,
        external_url: &str,
    ) -> ConnectorResult<()> {
        self.post_set(value, &ExternalUrlBody { external_url }).await
    }

    fn set_url(&self, value: &IdentifierValue) -> ConnectorResult<String> {
        let parts = value
            .dark_parts()
            .ok_or_else(|| ConnectorError::MalformedValue(malformed(value)))?;
        Ok(format!(
            "{}/core/set/{}/{}",
            self.base_url, self.repo_prefix, parts.suffix
        ))
    }

    async fn post_set<B: Serialize + ?Sized>(
        &self,
        value: &IdentifierValue,
        body: &B,
    ) -> ConnectorResult<()> {
        let url = self.set_url(value)?;
        debug!(url = %url, value = %value, "Sending dArk update");

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| transport_error(&url, e))?;
        check_status(&url, response).await?;
        Ok(())
    }
}

fn malformed(value: &IdentifierValue) -> pidreg_id::IdError {
    pidreg_id::IdError::Malformed {
        scheme: "dark",
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_body_shape() {
        let body = MetadataBody {
            payload: MetadataFields {
                author: None,
                title: Some("On Rivers"),
                year: Some("1999"),
                url: None,
                dark_id: "dark:/hope/x1",
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "payload": {"title": "On Rivers", "year": "1999", "darkId": "dark:/hope/x1"}
            })
        );
    }

    #[test]
    fn test_set_url_uses_configured_prefix_and_suffix() {
        let client = DarkClient::new(&DarkClientConfig::new("http://dark.local/", "hope")).unwrap();
        let value = IdentifierValue::dark("other", "abc").unwrap();
        assert_eq!(
            client.set_url(&value).unwrap(),
            "http://dark.local/core/set/hope/abc"
        );

        let doi = IdentifierValue::doi("10.5072/x").unwrap();
        assert!(matches!(
            client.set_url(&doi),
            Err(ConnectorError::MalformedValue(_))
        ));
    }
}
