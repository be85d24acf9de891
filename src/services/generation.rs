//! Naming of the physical indices that back a versioned alias.
//!
//! Two schemes exist and a bucket uses exactly one of them:
//! - `Counter`: `<alias>_<12-digit zero-padded generation>`, ordered
//! - `RandomHex`: `<alias>.<32 lowercase hex chars>`, unordered

use crate::errors::{StoreError, StoreResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Digits in a counter generation suffix.
pub const COUNTER_WIDTH: usize = 12;

const HEX_WIDTH: usize = 32;
const MAX_COUNTER: u64 = 999_999_999_999;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum GenerationScheme {
    #[default]
    Counter,
    RandomHex,
}

impl GenerationScheme {
    fn separator(self) -> char {
        match self {
            GenerationScheme::Counter => '_',
            GenerationScheme::RandomHex => '.',
        }
    }

    /// Prefix shared by every physical index of `alias`.
    pub fn prefix(self, alias: &str) -> String {
        format!("{alias}{}", self.separator())
    }

    /// True if `index` is a generation of `alias` under this scheme.
    pub fn matches(self, alias: &str, index: &str) -> bool {
        let Some(suffix) = index.strip_prefix(&self.prefix(alias)) else {
            return false;
        };
        match self {
            GenerationScheme::Counter => {
                suffix.len() == COUNTER_WIDTH && suffix.bytes().all(|b| b.is_ascii_digit())
            }
            GenerationScheme::RandomHex => {
                suffix.len() == HEX_WIDTH
                    && suffix
                        .bytes()
                        .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
            }
        }
    }

    /// Generation number of `index`; only the counter scheme has one.
    pub fn generation(self, alias: &str, index: &str) -> Option<u64> {
        if self != GenerationScheme::Counter || !self.matches(alias, index) {
            return None;
        }
        index[self.prefix(alias).len()..].parse().ok()
    }

    /// Pick the current generation among alias targets.
    ///
    /// Under the counter scheme the highest generation wins; otherwise the
    /// first match in name order.
    pub fn current<'a>(self, alias: &str, targets: impl IntoIterator<Item = &'a str>) -> Option<String> {
        let mut matching = targets
            .into_iter()
            .filter(|index| self.matches(alias, index));
        match self {
            GenerationScheme::Counter => matching
                .max_by_key(|index| self.generation(alias, index))
                .map(str::to_string),
            GenerationScheme::RandomHex => matching.next().map(str::to_string),
        }
    }

    /// Name for the next generation, given every existing physical index.
    pub fn next_name<'a>(
        self,
        alias: &str,
        existing: impl IntoIterator<Item = &'a str>,
    ) -> StoreResult<String> {
        match self {
            GenerationScheme::Counter => {
                let highest = existing
                    .into_iter()
                    .filter_map(|index| self.generation(alias, index))
                    .max()
                    .unwrap_or(0);
                if highest >= MAX_COUNTER {
                    return Err(StoreError::illegal_state(format!(
                        "generation counter for `{alias}` is exhausted"
                    )));
                }
                Ok(format!(
                    "{}{:0width$}",
                    self.prefix(alias),
                    highest + 1,
                    width = COUNTER_WIDTH
                ))
            }
            GenerationScheme::RandomHex => Ok(format!(
                "{}{}",
                self.prefix(alias),
                Uuid::new_v4().simple()
            )),
        }
    }
}

impl fmt::Display for GenerationScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationScheme::Counter => write!(f, "counter"),
            GenerationScheme::RandomHex => write!(f, "random-hex"),
        }
    }
}

impl FromStr for GenerationScheme {
    type Err = StoreError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "counter" => Ok(GenerationScheme::Counter),
            "random-hex" | "hex" => Ok(GenerationScheme::RandomHex),
            other => Err(StoreError::config(format!(
                "unknown generation scheme `{other}` (expected `counter` or `random-hex`)"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_starts_at_one_and_increments() {
        let scheme = GenerationScheme::Counter;
        assert_eq!(scheme.next_name("orders", []).unwrap(), "orders_000000000001");
        let existing = ["orders_000000000001", "orders_000000000007", "orders_archive"];
        assert_eq!(
            scheme.next_name("orders", existing).unwrap(),
            "orders_000000000008"
        );
    }

    #[test]
    fn counter_ignores_lookalikes() {
        let scheme = GenerationScheme::Counter;
        assert!(scheme.matches("orders", "orders_000000000002"));
        assert!(!scheme.matches("orders", "orders_00000000002"));
        assert!(!scheme.matches("orders", "orders-eu_000000000002"));
        assert!(!scheme.matches("orders", "orders.000000000002"));
        assert_eq!(
            scheme.current("orders", ["orders_000000000002", "orders_000000000010", "other"]),
            Some("orders_000000000010".to_string())
        );
    }

    #[test]
    fn counter_refuses_to_overflow_width() {
        let err = GenerationScheme::Counter
            .next_name("orders", ["orders_999999999999"])
            .unwrap_err();
        assert!(matches!(err, StoreError::IllegalState(_)));
    }

    #[test]
    fn random_hex_names_match_their_own_pattern() {
        let scheme = GenerationScheme::RandomHex;
        let name = scheme.next_name("orders", []).unwrap();
        assert!(scheme.matches("orders", &name));
        assert!(!GenerationScheme::Counter.matches("orders", &name));
        assert_eq!(scheme.generation("orders", &name), None);
    }

    #[test]
    fn scheme_parses_from_config_strings() {
        assert_eq!("counter".parse::<GenerationScheme>().unwrap(), GenerationScheme::Counter);
        assert_eq!(" Random-Hex ".parse::<GenerationScheme>().unwrap(), GenerationScheme::RandomHex);
        assert!("uuid".parse::<GenerationScheme>().is_err());
    }
}
