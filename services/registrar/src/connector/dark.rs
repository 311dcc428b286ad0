//! dArk connector.

use async_trait::async_trait;
use pidreg_id::{IdentifierValue, RecordId, Scheme};
use tracing::{info, warn};

use super::{ConnectorResult, RegistrationConnector};
use crate::client::DarkClient;
use crate::payload::RegistrationPayload;

/// Registers identifiers with a dArk service.
///
/// The service keeps no draft/public distinction and has no delete or
/// query calls: reservation stores metadata, registration stores metadata
/// plus the landing page, and deletion is local only.
pub struct DarkConnector {
    client: DarkClient,
}

impl DarkConnector {
    pub fn new(client: DarkClient) -> Self {
        Self { client }
    }

    /// Builds the value for an ark returned by `/core/new`. Arks that
    /// already carry their prefix are used as-is.
    fn value_for_ark(&self, ark: &str) -> ConnectorResult<IdentifierValue> {
        let ark = ark.trim().trim_start_matches('/');
        let value = if ark.contains('/') {
            IdentifierValue::parse(&format!("{}/{}", Scheme::Dark.value_prefix(), ark))?
        } else {
            IdentifierValue::dark(self.client.repo_prefix(), ark)?
        };
        Ok(value)
    }
}

#[async_trait]
impl RegistrationConnector for DarkConnector {
    fn scheme(&self) -> Scheme {
        Scheme::Dark
    }

    async fn mint_value(&self, _record: RecordId) -> ConnectorResult<IdentifierValue> {
        let ark = self.client.create_new().await?;
        self.value_for_ark(&ark)
    }

    async fn reserve(&self, payload: &RegistrationPayload) -> ConnectorResult<()> {
        self.client.set_metadata(payload).await
    }

    async fn register(&self, payload: &RegistrationPayload) -> ConnectorResult<()> {
        self.client.set_metadata(payload).await?;
        match &payload.landing_page {
            Some(url) => {
                self.client
                    .set_external_url(&payload.identifier, url)
                    .await
            }
            None => {
                warn!(
                    value = %payload.identifier,
                    "No landing page known, registering metadata only"
                );
                Ok(())
            }
        }
    }

    async fn update_metadata(&self, payload: &RegistrationPayload) -> ConnectorResult<()> {
        self.client.set_metadata(payload).await
    }

    async fn delete(&self, value: &IdentifierValue) -> ConnectorResult<()> {
        info!(value = %value, "dArk records are permanent, marking deleted locally");
        Ok(())
    }

    async fn is_reserved(&self, _value: &IdentifierValue) -> ConnectorResult<bool> {
        Ok(false)
    }

    async fn is_registered(&self, _value: &IdentifierValue) -> ConnectorResult<bool> {
        Ok(false)
    }
}
