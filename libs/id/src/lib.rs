//! # pidreg-id
//!
//! Stable ID types and persistent identifier parsing for pidreg.
//!
//! ## Design Principles
//!
//! - Local IDs are system-generated and never shown to resolvers
//! - Identifier values are the externally visible strings and have a strict grammar
//! - Values roundtrip through their canonical string form (parse → format → parse)
//! - Types keep local record IDs, resource references and identifier values apart
//!
//! ## Local ID Format
//!
//! Local IDs use a prefixed format: `{prefix}_{ulid}`
//!
//! - `pid_01HV4Z2WQXKJNM8GPQY6VBKC3D` (identifier record)
//! - `req_01HV4Z3MXNKPQR9HSTZ7WCLD4E` (request)
//!
//! ## Identifier Values
//!
//! - `doi:<registrant>/<suffix>`, e.g. `doi:10.5072/dspace-1`
//! - `dark:/<prefix>/<suffix>`, e.g. `dark:/hope/4f2a9c`

mod error;
mod macros;
mod types;
mod value;

pub use error::IdError;
pub use types::*;
pub use value::{DarkParts, IdentifierValue, Scheme};

/// Re-export ulid for consumers that need raw ULID operations
pub use ulid::Ulid;
