//! Persistent identifier values and their schemes.
//!
//! A value is the externally visible identifier string. Two schemes exist:
//!
//! - `doi:<registrant>/<suffix>`
//! - `dark:/<prefix>/<suffix>`, split with the fixed pattern `dark:/(.+)/(.+)`
//!
//! Values are validated once at parse time; holders of an `IdentifierValue`
//! can rely on the scheme pattern matching.

use std::sync::LazyLock;

use regex::Regex;

use crate::IdError;

static DARK_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^dark:/(.+)/(.+)$").expect("dark pattern compiles"));

/// Identifier scheme.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    Doi,
    Dark,
}

impl Scheme {
    /// All schemes, in display order.
    pub const ALL: [Scheme; 2] = [Scheme::Doi, Scheme::Dark];

    /// The prefix every value of this scheme starts with.
    pub const fn value_prefix(&self) -> &'static str {
        match self {
            Self::Doi => "doi:",
            Self::Dark => "dark:",
        }
    }

    /// Short lowercase tag used in storage and configuration.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Doi => "doi",
            Self::Dark => "dark",
        }
    }

    /// Parses a storage tag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "doi" => Some(Self::Doi),
            "dark" => Some(Self::Dark),
            _ => None,
        }
    }

    /// Human-readable name.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Doi => "DOI",
            Self::Dark => "dArk PID",
        }
    }
}

impl std::fmt::Display for Scheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Prefix/suffix pair of a dArk value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DarkParts<'a> {
    pub prefix: &'a str,
    pub suffix: &'a str,
}

/// A validated identifier value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IdentifierValue {
    scheme: Scheme,
    raw: String,
}

impl IdentifierValue {
    /// Parses and validates a value.
    pub fn parse(s: &str) -> Result<Self, IdError> {
        if s.is_empty() {
            return Err(IdError::Empty);
        }

        if let Some(name) = s.strip_prefix(Scheme::Doi.value_prefix()) {
            return match name.split_once('/') {
                Some((registrant, suffix)) if !registrant.is_empty() && !suffix.is_empty() => {
                    Ok(Self {
                        scheme: Scheme::Doi,
                        raw: s.to_string(),
                    })
                }
                _ => Err(IdError::Malformed {
                    scheme: "doi",
                    value: s.to_string(),
                }),
            };
        }

        if s.starts_with(Scheme::Dark.value_prefix()) {
            if !DARK_PATTERN.is_match(s) {
                return Err(IdError::Malformed {
                    scheme: "dark",
                    value: s.to_string(),
                });
            }
            return Ok(Self {
                scheme: Scheme::Dark,
                raw: s.to_string(),
            });
        }

        Err(IdError::UnknownScheme(s.to_string()))
    }

    /// Builds a DOI value from a DOI name such as `10.5072/abc`.
    pub fn doi(name: &str) -> Result<Self, IdError> {
        Self::parse(&format!("{}{}", Scheme::Doi.value_prefix(), name))
    }

    /// Builds a dArk value from its prefix and suffix.
    pub fn dark(prefix: &str, suffix: &str) -> Result<Self, IdError> {
        Self::parse(&format!("{}/{}/{}", Scheme::Dark.value_prefix(), prefix, suffix))
    }

    /// Returns the scheme.
    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// Returns the canonical string.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// DOI name (everything after `doi:`), if this is a DOI.
    pub fn doi_name(&self) -> Option<&str> {
        match self.scheme {
            Scheme::Doi => self.raw.strip_prefix(Scheme::Doi.value_prefix()),
            Scheme::Dark => None,
        }
    }

    /// dArk prefix and suffix, if this is a dArk value.
    pub fn dark_parts(&self) -> Option<DarkParts<'_>> {
        if self.scheme != Scheme::Dark {
            return None;
        }
        let captures = DARK_PATTERN.captures(&self.raw)?;
        let prefix = captures.get(1)?.as_str();
        let suffix = captures.get(2)?.as_str();
        Some(DarkParts { prefix, suffix })
    }
}

impl std::fmt::Display for IdentifierValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

impl std::str::FromStr for IdentifierValue {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for IdentifierValue {
    fn as_ref(&self) -> &str {
        &self.raw
    }
}

impl serde::Serialize for IdentifierValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> serde::Deserialize<'de> for IdentifierValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
