//! DOI connector over a DataCite-style agency.

use async_trait::async_trait;
use pidreg_id::{IdError, IdentifierValue, RecordId, Scheme};
use tracing::debug;

use super::{ConnectorError, ConnectorResult, LocalMinter, RegistrationConnector};
use crate::client::{DoiClient, DoiEvent, DoiState};
use crate::payload::RegistrationPayload;

/// Registers DOIs with a registration agency.
///
/// Values are minted locally from the configured prefix. Reservation keeps
/// the DOI a draft, registration publishes it. Deleting a draft removes it;
/// anything already public can only be hidden.
pub struct DoiConnector {
    client: DoiClient,
    minter: LocalMinter,
}

impl DoiConnector {
    pub fn new(
        client: DoiClient,
        prefix: impl Into<String>,
        namespace_separator: impl Into<String>,
    ) -> Self {
        Self {
            client,
            minter: LocalMinter::Doi {
                prefix: prefix.into(),
                namespace_separator: namespace_separator.into(),
            },
        }
    }
}

fn doi_name(value: &IdentifierValue) -> ConnectorResult<&str> {
    value.doi_name().ok_or_else(|| {
        ConnectorError::MalformedValue(IdError::Malformed {
            scheme: "doi",
            value: value.to_string(),
        })
    })
}

#[async_trait]
impl RegistrationConnector for DoiConnector {
    fn scheme(&self) -> Scheme {
        Scheme::Doi
    }

    async fn mint_value(&self, record: RecordId) -> ConnectorResult<IdentifierValue> {
        Ok(self.minter.mint(record)?)
    }

    async fn reserve(&self, payload: &RegistrationPayload) -> ConnectorResult<()> {
        let doi = doi_name(&payload.identifier)?;
        self.client.put_doi(doi, payload, None).await
    }

    async fn register(&self, payload: &RegistrationPayload) -> ConnectorResult<()> {
        let doi = doi_name(&payload.identifier)?;
        self.client
            .put_doi(doi, payload, Some(DoiEvent::Publish))
            .await
    }

    async fn update_metadata(&self, payload: &RegistrationPayload) -> ConnectorResult<()> {
        let doi = doi_name(&payload.identifier)?;
        self.client.put_doi(doi, payload, None).await
    }

    async fn delete(&self, value: &IdentifierValue) -> ConnectorResult<()> {
        let doi = doi_name(value)?;
        match self.client.get_state(doi).await? {
            None => {
                debug!(doi = %doi, "DOI unknown to agency, nothing to delete");
                Ok(())
            }
            Some(DoiState::Draft) => self.client.delete_doi(doi).await,
            Some(state) => {
                debug!(doi = %doi, state = ?state, "DOI is public, hiding instead of deleting");
                self.client.send_event(doi, DoiEvent::Hide).await
            }
        }
    }

    async fn is_reserved(&self, value: &IdentifierValue) -> ConnectorResult<bool> {
        let state = self.client.get_state(doi_name(value)?).await?;
        Ok(matches!(state, Some(DoiState::Draft)))
    }

    async fn is_registered(&self, value: &IdentifierValue) -> ConnectorResult<bool> {
        let state = self.client.get_state(doi_name(value)?).await?;
        Ok(matches!(
            state,
            Some(DoiState::Registered | DoiState::Findable)
        ))
    }
}
