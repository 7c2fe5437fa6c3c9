//! Newtype wrapper for ledger transaction identifiers.

use serde::{Deserialize, Serialize};

/// Identifier of a transaction group as returned by the ledger.
///
/// Firefly III serialises ids as strings (`"99"`), so the raw text is
/// kept rather than parsed into an integer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(String);

impl TransactionId {
    /// Creates a new identifier from the given string.
    #[inline]
    #[must_use]
    pub const fn new(value: String) -> Self {
        Self(value)
    }

    /// Returns a reference to the inner string.
    #[inline]
    #[must_use]
    pub fn as_inner(&self) -> &str {
        &self.0
    }

    /// Consumes the wrapper and returns the inner string.
    #[inline]
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl core::fmt::Display for TransactionId {
    #[inline]
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl From<String> for TransactionId {
    #[inline]
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for TransactionId {
    #[inline]
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_id_display() {
        let id = TransactionId::new("99".to_owned());
        assert_eq!(id.to_string(), "99");
        assert_eq!(id.as_inner(), "99");
    }

    #[test]
    fn string_id_deserializes_transparently() {
        let id: TransactionId = serde_json::from_str(r#""1234""#).unwrap();
        assert_eq!(id, TransactionId::from("1234"));
        assert_eq!(id.into_inner(), "1234");
    }
}
