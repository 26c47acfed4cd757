//! Mailing-list addressing
//!
//! Provides the normalized address type stored in every collection.
//!
//! # Normalization
//!
//! Addresses are trimmed and lower-cased on construction, so two addresses that
//! differ only in case are the same address. Equality and ordering follow the
//! normalized text, which gives every collection a stable lexicographic order.
//!
//! Whether an address is *valid* is a separate question answered by
//! [`AddressPattern`](super::AddressPattern), since the validation rule is
//! configuration rather than a property of the type.
//!
//! # Examples
//!
//! ```
//! use mailbase::mail::Address;
//!
//! let addr = Address::normalize("  Jane.Doe@Example.COM ");
//! assert_eq!(addr.as_str(), "jane.doe@example.com");
//! ```

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::BTreeSet;
use std::fmt;

/// A normalized (trimmed, lower-cased) mailing address
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Address(String);

impl Address {
    /// Normalize raw input into an address
    pub fn normalize(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_lowercase())
    }

    /// Normalize raw input, returning `None` when nothing is left after trimming
    pub fn parse_nonempty(raw: impl AsRef<str>) -> Option<Self> {
        let addr = Self::normalize(raw);
        if addr.0.is_empty() {
            None
        } else {
            Some(addr)
        }
    }

    /// Get the normalized text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Normalize a batch of caller-supplied strings into a fresh set
///
/// Empty inputs are dropped and duplicates collapse. The caller's data is never
/// touched.
pub fn normalize_all<I, S>(raw: I) -> BTreeSet<Address>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    raw.into_iter().filter_map(Address::parse_nonempty).collect()
}

impl From<String> for Address {
    fn from(s: String) -> Self {
        Self::normalize(s)
    }
}

impl From<&str> for Address {
    fn from(s: &str) -> Self {
        Self::normalize(s)
    }
}

impl From<Address> for String {
    fn from(addr: Address) -> Self {
        addr.0
    }
}

impl AsRef<str> for Address {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Address {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
