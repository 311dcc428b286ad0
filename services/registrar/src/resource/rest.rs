//! Resource directory backed by the repository's REST API.
//!
//! Fetches `GET {api}/core/items/{uuid}`, whose body carries the handle,
//! the type and a map of qualified field name to value list.

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use pidreg_id::ResourceId;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

use super::{MetadataEntry, ResourceDirectory, ResourceMetadata, ResourceType};

/// Configuration for [`RestResourceDirectory`].
#[derive(Debug, Clone)]
pub struct RestDirectoryConfig {
    /// Base URL of the REST API, e.g. `https://repo.example.org/server/api`.
    pub base_url: String,
    pub timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct ItemResponse {
    #[serde(default)]
    handle: Option<String>,
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    metadata: BTreeMap<String, Vec<MetadataValueResponse>>,
}

#[derive(Debug, Deserialize)]
struct MetadataValueResponse {
    value: String,
}

/// Looks resources up over HTTP.
pub struct RestResourceDirectory {
    client: reqwest::Client,
    base_url: String,
}

impl RestResourceDirectory {
    pub fn new(config: &RestDirectoryConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ResourceDirectory for RestResourceDirectory {
    async fn lookup(&self, id: ResourceId) -> anyhow::Result<Option<ResourceMetadata>> {
        let url = format!("{}/core/items/{}", self.base_url, id);
        debug!(url = %url, "Fetching resource metadata");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("failed to fetch resource {id}"))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("resource lookup for {id} failed: {status} - {body}");
        }

        let item: ItemResponse = response
            .json()
            .await
            .with_context(|| format!("malformed resource response for {id}"))?;

        let resource_type = match item.kind.as_deref() {
            Some("collection") => ResourceType::Collection,
            Some("community") => ResourceType::Community,
            _ => ResourceType::Item,
        };

        let metadata = item
            .metadata
            .into_iter()
            .flat_map(|(field, values)| {
                values.into_iter().map(move |v| MetadataEntry {
                    field: field.clone(),
                    value: v.value,
                })
            })
            .collect();

        Ok(Some(ResourceMetadata {
            id,
            resource_type,
            handle: item.handle,
            metadata,
        }))
    }
}
