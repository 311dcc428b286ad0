//! Registration connectors.
//!
//! A connector is the capability to talk to one remote registry. The
//! orchestrator holds one per [`Scheme`] and never knows which provider is
//! behind it. All mutating calls must be safe to repeat: the orchestrator
//! retries `Unreachable` without knowing whether the first request landed.

mod dark;
mod disabled;
mod doi;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use pidreg_id::{IdError, IdentifierValue, RecordId, Scheme};
use thiserror::Error;

use crate::client::{DarkClient, DarkClientConfig, DoiClient, DoiClientConfig};
use crate::config::Config;
use crate::payload::RegistrationPayload;

pub use dark::DarkConnector;
pub use disabled::DisabledConnector;
pub use doi::DoiConnector;

/// Failure of a connector call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConnectorError {
    /// The call could not be completed; retrying may succeed.
    #[error("unreachable: {0}")]
    Unreachable(String),

    /// The registry refused the request.
    #[error("rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The value does not fit this connector's scheme.
    #[error(transparent)]
    MalformedValue(#[from] IdError),
}

pub type ConnectorResult<T> = Result<T, ConnectorError>;

/// Capability interface to one remote registry.
#[async_trait]
pub trait RegistrationConnector: Send + Sync {
    /// Scheme of the values this connector handles.
    fn scheme(&self) -> Scheme;

    /// Produces a fresh identifier value for a new record.
    async fn mint_value(&self, record: RecordId) -> ConnectorResult<IdentifierValue>;

    async fn reserve(&self, payload: &RegistrationPayload) -> ConnectorResult<()>;

    async fn register(&self, payload: &RegistrationPayload) -> ConnectorResult<()>;

    async fn update_metadata(&self, payload: &RegistrationPayload) -> ConnectorResult<()>;

    async fn delete(&self, value: &IdentifierValue) -> ConnectorResult<()>;

    /// Remote truth, for reconciliation only.
    async fn is_reserved(&self, value: &IdentifierValue) -> ConnectorResult<bool>;

    /// Remote truth, for reconciliation only.
    async fn is_registered(&self, value: &IdentifierValue) -> ConnectorResult<bool>;
}

/// Generates identifier values without a remote call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalMinter {
    /// `doi:{prefix}/{namespace_separator}{suffix}`
    Doi {
        prefix: String,
        namespace_separator: String,
    },
    /// `dark:/{repo_prefix}/{suffix}`
    Dark { repo_prefix: String },
}

impl LocalMinter {
    pub fn scheme(&self) -> Scheme {
        match self {
            Self::Doi { .. } => Scheme::Doi,
            Self::Dark { .. } => Scheme::Dark,
        }
    }

    /// The suffix is the record's lowercase ULID, so values never collide.
    pub fn mint(&self, record: RecordId) -> Result<IdentifierValue, IdError> {
        match self {
            Self::Doi {
                prefix,
                namespace_separator,
            } => IdentifierValue::doi(&format!(
                "{prefix}/{namespace_separator}{}",
                record.suffix()
            )),
            Self::Dark { repo_prefix } => IdentifierValue::dark(repo_prefix, &record.suffix()),
        }
    }
}

/// One connector per scheme.
#[derive(Clone, Default)]
pub struct Connectors {
    by_scheme: HashMap<Scheme, Arc<dyn RegistrationConnector>>,
}

impl Connectors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `connector`, replacing any previous one for its scheme.
    pub fn with(mut self, connector: Arc<dyn RegistrationConnector>) -> Self {
        self.by_scheme.insert(connector.scheme(), connector);
        self
    }

    /// One connector per scheme; disabled providers get a [`DisabledConnector`].
    pub fn from_config(config: &Config) -> ConnectorResult<Self> {
        let dark: Arc<dyn RegistrationConnector> = match config.dark.base_url.as_deref() {
            Some(base_url) if config.dark.enabled => {
                let client = DarkClient::new(&DarkClientConfig {
                    base_url: base_url.to_string(),
                    repo_prefix: config.dark.repo_prefix.clone(),
                    timeout: config.http_timeout,
                })?;
                Arc::new(DarkConnector::new(client))
            }
            _ => Arc::new(DisabledConnector::new(LocalMinter::Dark {
                repo_prefix: config.dark.repo_prefix.clone(),
            })),
        };

        let doi: Arc<dyn RegistrationConnector> = match config.doi.base_url.as_deref() {
            Some(base_url) if config.doi.enabled => {
                let client = DoiClient::new(&DoiClientConfig {
                    base_url: base_url.to_string(),
                    username: config.doi.username.clone(),
                    password: config.doi.password.clone(),
                    timeout: config.http_timeout,
                })?;
                Arc::new(DoiConnector::new(
                    client,
                    config.doi.prefix.clone(),
                    config.doi.namespace_separator.clone(),
                ))
            }
            _ => Arc::new(DisabledConnector::new(LocalMinter::Doi {
                prefix: config.doi.prefix.clone(),
                namespace_separator: config.doi.namespace_separator.clone(),
            })),
        };

        Ok(Self::new().with(dark).with(doi))
    }

    pub fn get(&self, scheme: Scheme) -> Option<Arc<dyn RegistrationConnector>> {
        self.by_scheme.get(&scheme).cloned()
    }

    pub fn schemes(&self) -> impl Iterator<Item = Scheme> + '_ {
        self.by_scheme.keys().copied()
    }
}

impl std::fmt::Debug for Connectors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut schemes: Vec<_> = self.schemes().collect();
        schemes.sort();
        f.debug_struct("Connectors").field("schemes", &schemes).finish()
    }
}
