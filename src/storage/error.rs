//! Store error taxonomy
//!
//! Every failure an [`AddressStore`](super::AddressStore) operation can report.
//! A failed operation leaves all four collections exactly as they were.

use crate::mail::Address;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// The four collections held by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ListKind {
    /// Live mailing list (`[Mail]` section)
    Active,
    /// Excluded from mailing
    Removed,
    /// Addresses with a bounce count
    Returned,
    /// Staging area filled by extraction
    Extracted,
}

impl ListKind {
    /// All lists, in file order
    pub const ALL: [ListKind; 4] = [
        ListKind::Active,
        ListKind::Removed,
        ListKind::Returned,
        ListKind::Extracted,
    ];

    /// Section header used in list files
    pub fn header(self) -> &'static str {
        match self {
            ListKind::Active => "[Mail]",
            ListKind::Removed => "[Removed]",
            ListKind::Returned => "[Returned]",
            ListKind::Extracted => "[Extracted]",
        }
    }

    /// Parse a trimmed line as a section header
    pub fn from_header(line: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.header() == line)
    }

    /// The list that may not share members with this one
    pub fn exclusive_with(self) -> Option<Self> {
        match self {
            ListKind::Active => Some(ListKind::Removed),
            ListKind::Removed => Some(ListKind::Active),
            ListKind::Returned | ListKind::Extracted => None,
        }
    }

    /// Lower-case name, as used on the command line
    pub fn name(self) -> &'static str {
        match self {
            ListKind::Active => "active",
            ListKind::Removed => "removed",
            ListKind::Returned => "returned",
            ListKind::Extracted => "extracted",
        }
    }
}

impl fmt::Display for ListKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error type for address store operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the list file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed section or line structure
    #[error("invalid file format at line {line}: '{content}'")]
    InvalidFileFormat { line: usize, content: String },

    /// Input does not match the address pattern
    ///
    /// `line` is set when the input came from a list file.
    #[error("invalid address{}: '{content}'", at_line(.line))]
    InvalidAddress {
        line: Option<usize>,
        content: String,
    },

    /// Adding to `target` would put addresses in both active and removed
    #[error(
        "cannot add to {target}: {} already in the opposing list ({})",
        .conflicts.len(),
        join_addresses(.conflicts)
    )]
    MutualExclusion {
        target: ListKind,
        conflicts: Vec<Address>,
    },

    /// Lookup or decrement on an address absent from the returned list
    #[error("Address not found: {0}")]
    NotFound(Address),

    /// `save` called before any file was opened or named
    #[error("no current file; save under a new name first")]
    NoCurrentFile,
}

impl StoreError {
    /// The conflicting subset carried by a mutual-exclusion error
    pub fn conflicts(&self) -> Option<&[Address]> {
        match self {
            StoreError::MutualExclusion { conflicts, .. } => Some(conflicts),
            _ => None,
        }
    }

}

fn at_line(line: &Option<usize>) -> String {
    line.map(|n| format!(" at line {}", n)).unwrap_or_default()
}

fn join_addresses(addresses: &[Address]) -> String {
    addresses
        .iter()
        .map(Address::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
