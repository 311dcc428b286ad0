//! pidreg Registrar
//!
//! Assigns persistent identifiers (DOIs and dArk PIDs) to repository
//! resources and keeps each identifier's registration in step with the
//! remote registry that owns it.
//!
//! ## Architecture
//!
//! ```text
//! RegistrationWorker ──> Registrar ──> RecordStore (SQLite, source of truth)
//!                           │
//!                           ├──> ResourceDirectory (read-only resource view)
//!                           └──> Connectors ──> Dark / Doi / Disabled connectors
//!                                                   │
//!                                                   └──> DarkClient / DoiClient (HTTP)
//! ```
//!
//! ## Modules
//!
//! - `status`: lifecycle statuses and the transition table
//! - `record`: the identifier record
//! - `store`: SQLite persistence with compare-and-swap updates
//! - `payload`: metadata projection for registry payloads
//! - `connector` / `client`: registry capability and HTTP clients
//! - `orchestrator`: intent/confirm execution, sweeps and queries
//! - `worker`: background queue and retry sweep

pub mod client;
pub mod config;
pub mod connector;
pub mod context;
pub mod error;
pub mod orchestrator;
pub mod payload;
pub mod record;
pub mod resource;
pub mod status;
pub mod store;
pub mod worker;

pub use connector::{ConnectorError, Connectors, RegistrationConnector};
pub use context::RequestContext;
pub use error::{RegistrarError, RegistrarResult};
pub use orchestrator::{
    Action, Binding, IdentifierSummary, Outcome, Registrar, RemoteState, Resolution, SweepStats,
};
pub use record::IdentifierRecord;
pub use status::{IllegalTransition, Status};
pub use store::{RecordStore, StoreError};
