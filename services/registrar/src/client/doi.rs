//! Client for a DataCite-style DOI REST API.
//!
//! DOIs are created and updated with `PUT /dois/{doi}` carrying a JSON:API
//! document. The `event` attribute drives the remote state: none keeps a
//! draft, `publish` makes it findable, `hide` moves it to registered but not
//! findable. Only drafts can be deleted outright.

use std::time::Duration;

use reqwest::{Method, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{build_http_client, check_status, read_json, transport_error, DEFAULT_TIMEOUT};
use crate::connector::ConnectorResult;
use crate::payload::RegistrationPayload;

/// Connection settings for [`DoiClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoiClientConfig {
    pub base_url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout: Duration,
}

impl DoiClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            username: None,
            password: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }
}

/// Remote state of a DOI.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DoiState {
    Draft,
    Registered,
    Findable,
    #[serde(other)]
    Unknown,
}

/// Lifecycle event sent with a `PUT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum DoiEvent {
    Publish,
    Hide,
}

#[derive(Debug, Serialize)]
struct DoiDocument<'a> {
    data: DoiData<'a>,
}

#[derive(Debug, Serialize)]
struct DoiData<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    attributes: DoiAttributes<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DoiAttributes<'a> {
    doi: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    event: Option<DoiEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    titles: Vec<Title<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    creators: Vec<Creator<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    publication_year: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct Title<'a> {
    title: &'a str,
}

#[derive(Debug, Serialize)]
struct Creator<'a> {
    name: &'a str,
}

#[derive(Debug, Deserialize)]
struct StateDocument {
    data: StateData,
}

#[derive(Debug, Deserialize)]
struct StateData {
    attributes: StateAttributes,
}

#[derive(Debug, Deserialize)]
struct StateAttributes {
    state: DoiState,
}

/// HTTP client for one DOI registration agency.
pub struct DoiClient {
    client: reqwest::Client,
    base_url: String,
    credentials: Option<(String, Option<String>)>,
}

impl DoiClient {
    pub fn new(config: &DoiClientConfig) -> ConnectorResult<Self> {
        Ok(Self {
            client: build_http_client(config.timeout)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            credentials: config
                .username
                .clone()
                .map(|user| (user, config.password.clone())),
        })
    }

    fn doi_url(&self, doi: &str) -> String {
        format!("{}/dois/{}", self.base_url, doi)
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.credentials {
            Some((user, password)) => builder.basic_auth(user, password.as_deref()),
            None => builder,
        }
    }

    /// Creates or updates `doi` with the payload's metadata.
    pub(crate) async fn put_doi(
        &self,
        doi: &str,
        payload: &RegistrationPayload,
        event: Option<DoiEvent>,
    ) -> ConnectorResult<()> {
        let url = self.doi_url(doi);
        debug!(url = %url, event = ?event, "Sending DOI metadata");

        let document = DoiDocument {
            data: DoiData {
                kind: "dois",
                attributes: attributes(doi, payload, event),
            },
        };

        let response = self
            .request(Method::PUT, &url)
            .json(&document)
            .send()
            .await
            .map_err(|e| transport_error(&url, e))?;
        check_status(&url, response).await?;
        Ok(())
    }

    /// Sends only an event, e.g. `hide`, without touching metadata.
    pub(crate) async fn send_event(&self, doi: &str, event: DoiEvent) -> ConnectorResult<()> {
        let url = self.doi_url(doi);
        let document = serde_json::json!({
            "data": {"type": "dois", "attributes": {"doi": doi, "event": event}}
        });

        let response = self
            .request(Method::PUT, &url)
            .json(&document)
            .send()
            .await
            .map_err(|e| transport_error(&url, e))?;
        check_status(&url, response).await?;
        Ok(())
    }

    /// Deletes a draft DOI. A DOI that no longer exists counts as deleted.
    pub(crate) async fn delete_doi(&self, doi: &str) -> ConnectorResult<()> {
        let url = self.doi_url(doi);
        debug!(url = %url, "Deleting draft DOI");

        let response = self
            .request(Method::DELETE, &url)
            .send()
            .await
            .map_err(|e| transport_error(&url, e))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        check_status(&url, response).await?;
        Ok(())
    }

    /// Current remote state, or `None` if the DOI is unknown to the agency.
    pub async fn get_state(&self, doi: &str) -> ConnectorResult<Option<DoiState>> {
        let url = self.doi_url(doi);

        let response = self
            .request(Method::GET, &url)
            .send()
            .await
            .map_err(|e| transport_error(&url, e))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = check_status(&url, response).await?;
        let document: StateDocument = read_json(&url, response).await?;
        Ok(Some(document.data.attributes.state))
    }
}

fn attributes<'a>(
    doi: &'a str,
    payload: &'a RegistrationPayload,
    event: Option<DoiEvent>,
) -> DoiAttributes<'a> {
    DoiAttributes {
        doi,
        event,
        url: payload
            .landing_page
            .as_deref()
            .or(payload.url.as_deref()),
        titles: payload
            .title
            .as_deref()
            .map(|title| vec![Title { title }])
            .unwrap_or_default(),
        creators: payload
            .author
            .as_deref()
            .map(|name| vec![Creator { name }])
            .unwrap_or_default(),
        publication_year: payload.year.as_deref(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pidreg_id::IdentifierValue;

    #[test]
    fn test_attributes_prefer_landing_page() {
        let mut payload = RegistrationPayload::bare(IdentifierValue::doi("10.5072/a1").unwrap());
        payload.title = Some("Maps".into());
        payload.url = Some("http://hdl.handle.net/1/2".into());
        payload.landing_page = Some("https://ui/1/2".into());

        let json = serde_json::to_value(attributes("10.5072/a1", &payload, Some(DoiEvent::Publish)))
            .unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "doi": "10.5072/a1",
                "event": "publish",
                "url": "https://ui/1/2",
                "titles": [{"title": "Maps"}]
            })
        );
    }

    #[test]
    fn test_state_parsing() {
        let doc: StateDocument =
            serde_json::from_str(r#"{"data":{"attributes":{"state":"findable"}}}"#).unwrap();
        assert_eq!(doc.data.attributes.state, DoiState::Findable);

        let doc: StateDocument =
            serde_json::from_str(r#"{"data":{"attributes":{"state":"tombstoned"}}}"#).unwrap();
        assert_eq!(doc.data.attributes.state, DoiState::Unknown);
    }
}
