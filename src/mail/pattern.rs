//! Address validation and extraction rule
//!
//! One configured regular expression drives three things: validating lines read
//! from a list file, validating addresses typed by a user, and finding addresses
//! inside free-form text. [`AddressPattern`] compiles it once in the two shapes
//! those uses need.

use super::address::Address;
use regex::{Regex, RegexBuilder};

/// Default rule: a conventional lower-case e-mail address
pub const DEFAULT_ADDRESS_PATTERN: &str = r"[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}";

/// A compiled address rule
///
/// - `matches` requires the whole (lower-cased) input to match
/// - `find_all` scans text for non-overlapping matches, ignoring case
#[derive(Debug, Clone)]
pub struct AddressPattern {
    source: String,
    full: Regex,
    search: Regex,
}

impl AddressPattern {
    /// Compile a pattern
    ///
    /// # Errors
    /// Returns the regex error if the pattern does not compile.
    pub fn new(pattern: impl Into<String>) -> Result<Self, regex::Error> {
        let source = pattern.into();

        let full = RegexBuilder::new(&format!("^(?:{})$", source))
            .case_insensitive(true)
            .build()?;
        let search = RegexBuilder::new(&source).case_insensitive(true).build()?;

        Ok(Self {
            source,
            full,
            search,
        })
    }

    /// The pattern text as configured
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Check whether the whole input, lower-cased, is an address
    pub fn matches(&self, candidate: &str) -> bool {
        self.full.is_match(&candidate.to_lowercase())
    }

    /// Validate and normalize a single input
    pub fn parse(&self, candidate: &str) -> Option<Address> {
        let addr = Address::parse_nonempty(candidate)?;
        self.matches(addr.as_str()).then_some(addr)
    }

    /// Find every non-overlapping address in `text`, in order of appearance
    ///
    /// Matches are normalized; duplicates are kept so callers can count hits.
    /// A match that would not validate on its own (for example one relying on
    /// surrounding context) is skipped.
    pub fn find_all(&self, text: &str) -> Vec<Address> {
        self.search
            .find_iter(text)
            .filter_map(|m| self.parse(m.as_str()))
            .collect()
    }
}

impl Default for AddressPattern {
    fn default() -> Self {
        // The built-in pattern is a literal known to compile.
        match Self::new(DEFAULT_ADDRESS_PATTERN) {
            Ok(pattern) => pattern,
            Err(e) => unreachable!("default address pattern must compile: {e}"),
        }
    }
}
