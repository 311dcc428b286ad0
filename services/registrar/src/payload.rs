//! Projection of resource metadata into a registration payload.
//!
//! Two field lists are intersected: [`ALLOWED_METADATA`], the fields the
//! provider schemas can carry, and the deployment's requested fields. Only
//! fields in both are copied. Missing values are omitted, never defaulted.

use std::collections::BTreeSet;

use pidreg_id::IdentifierValue;
use serde::Serialize;

use crate::resource::ResourceMetadata;

pub const FIELD_AUTHOR: &str = "dc.contributor.author";
pub const FIELD_TITLE: &str = "dc.title";
pub const FIELD_URI: &str = "dc.identifier.uri";
pub const FIELD_ISSUED: &str = "dc.date.issued";

/// Fields any provider payload can carry.
pub const ALLOWED_METADATA: [&str; 4] = [FIELD_AUTHOR, FIELD_TITLE, FIELD_URI, FIELD_ISSUED];

/// Deployment settings for payload construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadConfig {
    /// Fields the deployment wants sent.
    pub requested_fields: BTreeSet<String>,
    /// Public UI base URL used to build landing pages.
    pub ui_base_url: Option<String>,
}

impl Default for PayloadConfig {
    fn default() -> Self {
        Self {
            requested_fields: ALLOWED_METADATA.iter().map(|f| f.to_string()).collect(),
            ui_base_url: None,
        }
    }
}

impl PayloadConfig {
    /// Parses a comma separated field list, ignoring blanks.
    pub fn with_requested(mut self, list: &str) -> Self {
        self.requested_fields = list
            .split(',')
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(str::to_string)
            .collect();
        self
    }

    pub fn with_ui_base_url(mut self, url: impl Into<String>) -> Self {
        self.ui_base_url = Some(url.into());
        self
    }

    fn sends(&self, field: &str) -> bool {
        ALLOWED_METADATA.contains(&field) && self.requested_fields.contains(field)
    }
}

/// What a connector sends for one identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistrationPayload {
    pub identifier: IdentifierValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Public landing page, when the resource has a handle.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub landing_page: Option<String>,
}

impl RegistrationPayload {
    /// A payload carrying only the identifier.
    pub fn bare(identifier: IdentifierValue) -> Self {
        Self {
            identifier,
            author: None,
            title: None,
            year: None,
            url: None,
            landing_page: None,
        }
    }
}

/// Builds the payload for `identifier` from `resource`. Pure.
pub fn build_payload(
    identifier: &IdentifierValue,
    resource: &ResourceMetadata,
    config: &PayloadConfig,
) -> RegistrationPayload {
    let field = |name: &str| {
        config
            .sends(name)
            .then(|| resource.first_value(name))
            .flatten()
            .map(str::to_string)
    };

    let landing_page = match (&config.ui_base_url, &resource.handle) {
        (Some(base), Some(handle)) => Some(format!("{}/{}", base.trim_end_matches('/'), handle)),
        _ => None,
    };

    RegistrationPayload {
        identifier: identifier.clone(),
        author: field(FIELD_AUTHOR),
        title: field(FIELD_TITLE),
        year: field(FIELD_ISSUED).map(|issued| year_of(&issued)),
        url: field(FIELD_URI),
        landing_page,
    }
}

/// `2019-04-01` -> `2019`; anything not starting with four digits is kept.
fn year_of(issued: &str) -> String {
    match issued.get(..4) {
        Some(year) if year.bytes().all(|b| b.is_ascii_digit()) => year.to_string(),
        _ => issued.to_string(),
    }
}
