//! Basic summary model (`/summary/basic`).

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Key/value summary returned by the ledger, keyed by names such as
/// `spent-in-ZAR` or `net-worth-in-EUR`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BasicSummary(HashMap<String, SummaryEntry>);

/// One figure of the basic summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryEntry {
    /// Raw monetary value.
    pub monetary_value: Decimal,
}

impl BasicSummary {
    /// Looks up an entry by its full key.
    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&SummaryEntry> {
        self.0.get(key)
    }

    /// Returns the number of entries.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the summary has no entries.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, Decimal)> for BasicSummary {
    #[inline]
    fn from_iter<I: IntoIterator<Item = (String, Decimal)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, monetary_value)| (key, SummaryEntry { monetary_value }))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_basic_summary() {
        let json = r#"{
            "spent-in-ZAR": {
                "key": "spent-in-ZAR",
                "title": "Spent (R)",
                "monetary_value": -1234.56,
                "currency_code": "ZAR",
                "value_parsed": "-R1,234.56"
            },
            "net-worth-in-ZAR": {
                "key": "net-worth-in-ZAR",
                "monetary_value": "98765.40"
            }
        }"#;
        let summary: BasicSummary = serde_json::from_str(json).unwrap();
        assert_eq!(summary.len(), 2);
        assert_eq!(
            summary.get("spent-in-ZAR").unwrap().monetary_value,
            Decimal::new(-123_456, 2)
        );
        assert_eq!(
            summary.get("net-worth-in-ZAR").unwrap().monetary_value,
            Decimal::new(9_876_540, 2)
        );
        assert!(summary.get("earned-in-ZAR").is_none());
    }

    #[test]
    fn collect_from_pairs() {
        let summary: BasicSummary = [("earned-in-EUR".to_owned(), Decimal::ONE)]
            .into_iter()
            .collect();
        assert!(!summary.is_empty());
        assert_eq!(
            summary.get("earned-in-EUR").unwrap().monetary_value,
            Decimal::ONE
        );
    }
}
