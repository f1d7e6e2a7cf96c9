//! Canonical identifier types.
//!
//! Both upstreams are loose about identifier types: the catalog API sends
//! numbers, the content store may hand back the same column as a number or a
//! string depending on field configuration. Everything is converted to a
//! canonical string once, at deserialization time, so comparisons downstream
//! never depend on the wire type.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Int(i64),
    Uint(u64),
    Str(String),
}

impl RawId {
    fn into_string(self) -> String {
        match self {
            RawId::Int(n) => n.to_string(),
            RawId::Uint(n) => n.to_string(),
            RawId::Str(s) => s,
        }
    }
}

/// Canonicalizes a raw identifier: trims whitespace and strips leading zeros
/// from purely numeric values. Returns `None` for empty input and for `0`,
/// which the catalog API uses to mean "no id".
fn canonicalize(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.bytes().all(|b| b.is_ascii_digit()) {
        let digits = trimmed.trim_start_matches('0');
        if digits.is_empty() {
            return None;
        }
        return Some(digits.to_string());
    }
    Some(trimmed.to_string())
}

/// Identifier assigned by the source catalog (category, product, variant).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExternalId(String);

impl ExternalId {
    /// Parses and canonicalizes an identifier. `""` and `"0"` yield `None`.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        canonicalize(raw).map(Self)
    }

    /// Builds an id from a numeric value; `0` and negatives yield `None`.
    #[must_use]
    pub fn from_number(n: i64) -> Option<Self> {
        (n > 0).then(|| Self(n.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric form, for integer columns. `None` for non-numeric ids.
    #[must_use]
    pub fn as_number(&self) -> Option<i64> {
        self.0.parse().ok()
    }
}

impl std::fmt::Display for ExternalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for ExternalId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ExternalId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawId::deserialize(deserializer)?.into_string();
        Self::parse(&raw).ok_or_else(|| de::Error::custom(format!("invalid external id \"{raw}\"")))
    }
}

/// Deserializes an optional external id where `null`, missing, `0` and `""`
/// all mean "absent". Use with `#[serde(default, deserialize_with = ...)]`.
///
/// # Errors
///
/// Fails only when the value is neither a number, a string, nor `null`.
pub fn deserialize_optional_external_id<'de, D>(
    deserializer: D,
) -> Result<Option<ExternalId>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawId>::deserialize(deserializer)?;
    Ok(raw.and_then(|r| ExternalId::parse(&r.into_string())))
}

/// Primary key of a record in the content store. Opaque: may be an integer
/// or a UUID depending on the collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(String);

impl ItemId {
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Ordering key that sorts numeric ids numerically (so `9 < 10`) and
    /// falls back to lexical order otherwise.
    #[must_use]
    pub fn sort_key(&self) -> (u8, i64, &str) {
        match self.0.parse::<i64>() {
            Ok(n) => (0, n, ""),
            Err(_) => (1, 0, self.0.as_str()),
        }
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for ItemId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0.parse::<i64>() {
            Ok(n) => serializer.serialize_i64(n),
            Err(_) => serializer.serialize_str(&self.0),
        }
    }
}

impl<'de> Deserialize<'de> for ItemId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawId::deserialize(deserializer)?.into_string();
        if raw.trim().is_empty() {
            return Err(de::Error::custom("empty item id"));
        }
        Ok(Self(raw.trim().to_string()))
    }
}
