//! Entity identity
//!
//! Every synchronized record is deduplicated by an [`IdentityKey`]. The key is
//! built by exactly one normalization function, so a symbol typed as ` PEPE `
//! and one delivered as `pepe` always compare equal.

use serde::de::DeserializeOwned;
use std::fmt;

/// Normalized (trimmed, lower-cased) identity of an entity
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdentityKey(String);

impl IdentityKey {
    /// Normalize a raw symbol or id into an identity key
    pub fn new(raw: &str) -> Self {
        Self(raw.trim().to_lowercase())
    }

    /// An empty key means the payload carried no usable identity
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for IdentityKey {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

/// A record held in a synchronized collection
///
/// Implementors name the source table they are loaded from and expose the raw
/// value their identity key is derived from.
pub trait Entity: Clone + Send + Sync + DeserializeOwned + 'static {
    /// Source table name (e.g. "tokens")
    const TABLE: &'static str;

    /// Column carrying the identity value (used to key delete payloads)
    const IDENTITY_FIELD: &'static str;

    /// Raw identity value before normalization
    fn raw_identity(&self) -> &str;

    /// Canonical identity key for deduplication
    fn identity_key(&self) -> IdentityKey {
        IdentityKey::new(self.raw_identity())
    }

    /// Whether two records refer to the same entity
    fn same_identity(&self, other: &Self) -> bool {
        self.identity_key() == other.identity_key()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_key_normalizes() {
        assert_eq!(IdentityKey::new("  PePe "), IdentityKey::new("pepe"));
        assert_eq!(IdentityKey::new("WIF").as_str(), "wif");
    }

    #[test]
    fn test_identity_key_empty() {
        assert!(IdentityKey::new("   ").is_empty());
        assert!(!IdentityKey::new("x").is_empty());
    }

    #[test]
    fn test_identity_key_display() {
        assert_eq!(IdentityKey::from("BONK").to_string(), "bonk");
    }
}
