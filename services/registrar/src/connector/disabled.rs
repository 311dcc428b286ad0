//! Connector used when registration is administratively disabled.

use async_trait::async_trait;
use pidreg_id::{IdentifierValue, RecordId, Scheme};
use tracing::debug;

use super::{ConnectorResult, LocalMinter, RegistrationConnector};
use crate::payload::RegistrationPayload;

/// Accepts every call without I/O. Values are still minted locally so
/// records can be created while the provider is switched off.
#[derive(Debug, Clone)]
pub struct DisabledConnector {
    minter: LocalMinter,
}

impl DisabledConnector {
    pub fn new(minter: LocalMinter) -> Self {
        Self { minter }
    }
}

#[async_trait]
impl RegistrationConnector for DisabledConnector {
    fn scheme(&self) -> Scheme {
        self.minter.scheme()
    }

    async fn mint_value(&self, record: RecordId) -> ConnectorResult<IdentifierValue> {
        Ok(self.minter.mint(record)?)
    }

    async fn reserve(&self, payload: &RegistrationPayload) -> ConnectorResult<()> {
        debug!(value = %payload.identifier, "Registration disabled, skipping reserve");
        Ok(())
    }

    async fn register(&self, payload: &RegistrationPayload) -> ConnectorResult<()> {
        debug!(value = %payload.identifier, "Registration disabled, skipping register");
        Ok(())
    }

    async fn update_metadata(&self, payload: &RegistrationPayload) -> ConnectorResult<()> {
        debug!(value = %payload.identifier, "Registration disabled, skipping update");
        Ok(())
    }

    async fn delete(&self, value: &IdentifierValue) -> ConnectorResult<()> {
        debug!(value = %value, "Registration disabled, skipping delete");
        Ok(())
    }

    async fn is_reserved(&self, _value: &IdentifierValue) -> ConnectorResult<bool> {
        Ok(false)
    }

    async fn is_registered(&self, _value: &IdentifierValue) -> ConnectorResult<bool> {
        Ok(false)
    }
}
