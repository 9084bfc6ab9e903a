//! Validated topic names.
//!
//! A [`Topic`] is a string of the form `<namespace>:<id>` where the
//! namespace is one of the [`TopicNamespace`] variants and `<id>` is a
//! non-empty identifier. Topics are only ever constructed through
//! [`Topic::parse`], so a malformed name can never reach the hub's indices.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Namespaces a topic may belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TopicNamespace {
    /// `city:<id>`: city-wide updates.
    City,
    /// `order:<id>`: lifecycle of a single order.
    Order,
    /// `driver:<id>`: position and status of a single driver.
    Driver,
    /// `controlcenter:<id>`: dispatcher dashboards.
    ControlCenter,
}

impl TopicNamespace {
    /// All namespaces accepted by the validator.
    pub const ALL: [Self; 4] = [Self::City, Self::Order, Self::Driver, Self::ControlCenter];

    /// Returns the textual prefix (without the trailing `:`).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::City => "city",
            Self::Order => "order",
            Self::Driver => "driver",
            Self::ControlCenter => "controlcenter",
        }
    }

    fn from_prefix(prefix: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|ns| ns.as_str() == prefix)
    }
}

impl fmt::Display for TopicNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reason a string was rejected as a topic.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TopicError {
    /// The string has no `:` separator.
    #[error("topic `{0}` is missing a namespace separator")]
    MissingSeparator(String),

    /// The namespace is not one of the known prefixes.
    #[error("unknown topic namespace `{0}`")]
    UnknownNamespace(String),

    /// Nothing follows the `:` separator.
    #[error("topic `{0}` has an empty identifier")]
    EmptyIdentifier(String),
}

/// A validated topic name such as `order:123`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Topic {
    raw: String,
    namespace: TopicNamespace,
}

impl Topic {
    /// Validates `raw` and wraps it as a [`Topic`].
    ///
    /// # Errors
    ///
    /// Returns a [`TopicError`] if `raw` is not `<namespace>:<id>` with a
    /// known namespace and a non-empty id.
    pub fn parse(raw: &str) -> Result<Self, TopicError> {
        let Some((prefix, id)) = raw.split_once(':') else {
            return Err(TopicError::MissingSeparator(raw.to_string()));
        };
        let Some(namespace) = TopicNamespace::from_prefix(prefix) else {
            return Err(TopicError::UnknownNamespace(prefix.to_string()));
        };
        if id.is_empty() {
            return Err(TopicError::EmptyIdentifier(raw.to_string()));
        }
        Ok(Self {
            raw: raw.to_string(),
            namespace,
        })
    }

    /// Builds a topic from a namespace and identifier.
    ///
    /// # Errors
    ///
    /// Returns [`TopicError::EmptyIdentifier`] if `id` is empty.
    pub fn new(namespace: TopicNamespace, id: &str) -> Result<Self, TopicError> {
        Self::parse(&format!("{namespace}:{id}"))
    }

    /// Returns `true` if `raw` would be accepted by [`Topic::parse`].
    #[must_use]
    pub fn is_valid(raw: &str) -> bool {
        Self::parse(raw).is_ok()
    }

    /// Returns the namespace of this topic.
    #[must_use]
    pub const fn namespace(&self) -> TopicNamespace {
        self.namespace
    }

    /// Returns the identifier segment after the namespace.
    #[must_use]
    pub fn id(&self) -> &str {
        self.raw.split_once(':').map_or("", |(_, id)| id)
    }

    /// Returns the full topic string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for Topic {
    type Err = TopicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Topic {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for Topic {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

impl AsRef<str> for Topic {
    fn as_ref(&self) -> &str {
        &self.raw
    }
}
