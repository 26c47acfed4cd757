//! Section-based list file parser and serializer
//!
//! Handles reading and writing the four address collections as plain text.
//! A section header on its own line selects the collection that the following
//! lines belong to:
//!
//! ```text
//! [Mail]
//! ann@example.com
//! [Removed]
//! bob@example.com
//! [Returned]
//! cat@example.com 3
//! [Extracted]
//! dan@example.com
//! ```
//!
//! Sections may appear in any order and may repeat; entries accumulate, and
//! repeated `[Returned]` entries for one address have their counts summed.

use super::error::{ListKind, StoreError};
use crate::mail::{Address, AddressPattern};
use serde::Serialize;
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// The full contents of a list file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ListSnapshot {
    /// Live mailing list
    pub active: BTreeSet<Address>,

    /// Excluded from mailing
    pub removed: BTreeSet<Address>,

    /// Bounce count per address
    pub returned: BTreeMap<Address, u32>,

    /// Staging area
    pub extracted: BTreeSet<Address>,
}

impl ListSnapshot {
    /// True if all four collections are empty
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
            && self.removed.is_empty()
            && self.returned.is_empty()
            && self.extracted.is_empty()
    }

    /// True if `addr` is a member of the `kind` collection
    pub fn contains(&self, kind: ListKind, addr: &Address) -> bool {
        match kind {
            ListKind::Active => self.active.contains(addr),
            ListKind::Removed => self.removed.contains(addr),
            ListKind::Returned => self.returned.contains_key(addr),
            ListKind::Extracted => self.extracted.contains(addr),
        }
    }

    /// Add `addr` to the `kind` collection, returning false if already present
    ///
    /// A new returned entry starts at count 0.
    pub fn insert(&mut self, kind: ListKind, addr: Address) -> bool {
        match kind {
            ListKind::Active => self.active.insert(addr),
            ListKind::Removed => self.removed.insert(addr),
            ListKind::Extracted => self.extracted.insert(addr),
            ListKind::Returned => match self.returned.entry(addr) {
                Entry::Vacant(entry) => {
                    entry.insert(0);
                    true
                }
                Entry::Occupied(_) => false,
            },
        }
    }

    /// Members of one collection, in order
    pub fn addresses(&self, kind: ListKind) -> Vec<&Address> {
        match kind {
            ListKind::Active => self.active.iter().collect(),
            ListKind::Removed => self.removed.iter().collect(),
            ListKind::Returned => self.returned.keys().collect(),
            ListKind::Extracted => self.extracted.iter().collect(),
        }
    }
}

/// List file reader
pub struct ListFileReader<R> {
    reader: R,
}

impl ListFileReader<BufReader<File>> {
    /// Open a list file for reading
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let file = File::open(path)?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> ListFileReader<R> {
    /// Wrap any buffered reader
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Parse every section, validating addresses against `pattern`
    ///
    /// Blank lines are skipped. An address listed under both `[Mail]` and
    /// `[Removed]` is a format error. Nothing is returned unless the whole
    /// input parses.
    pub fn read_all(self, pattern: &AddressPattern) -> Result<ListSnapshot, StoreError> {
        let mut lists = ListSnapshot::default();
        let mut section: Option<ListKind> = None;

        for (index, line_result) in self.reader.lines().enumerate() {
            let line_no = index + 1;
            let raw = line_result?;
            let line = raw.trim();

            if line.is_empty() {
                continue;
            }

            if let Some(kind) = ListKind::from_header(line) {
                section = Some(kind);
                continue;
            }

            let Some(kind) = section else {
                return Err(StoreError::InvalidFileFormat {
                    line: line_no,
                    content: line.to_string(),
                });
            };

            let line = line.to_lowercase();
            match kind {
                ListKind::Returned => {
                    let (addr, count) = parse_returned_line(&line, line_no, pattern)?;
                    let entry = lists.returned.entry(addr).or_insert(0);
                    *entry = entry.checked_add(count).ok_or_else(|| {
                        StoreError::InvalidFileFormat {
                            line: line_no,
                            content: line.clone(),
                        }
                    })?;
                }
                ListKind::Active | ListKind::Removed | ListKind::Extracted => {
                    if !pattern.matches(&line) {
                        return Err(StoreError::InvalidAddress {
                            line: Some(line_no),
                            content: line,
                        });
                    }
                    let addr = Address::normalize(&line);

                    // Active and removed may not share members.
                    if let Some(opposing) = kind.exclusive_with() {
                        if lists.contains(opposing, &addr) {
                            tracing::debug!(line = line_no, %addr, %opposing, "Address listed in both exclusive sections");
                            return Err(StoreError::InvalidFileFormat {
                                line: line_no,
                                content: line,
                            });
                        }
                    }
                    lists.insert(kind, addr);
                }
            }
        }

        Ok(lists)
    }
}

/// Parse `<address> <count>` from a `[Returned]` section
fn parse_returned_line(
    line: &str,
    line_no: usize,
    pattern: &AddressPattern,
) -> Result<(Address, u32), StoreError> {
    let format_error = || StoreError::InvalidFileFormat {
        line: line_no,
        content: line.to_string(),
    };

    let tokens: Vec<&str> = line.split_whitespace().collect();
    let [address, count] = tokens.as_slice() else {
        return Err(format_error());
    };

    if !pattern.matches(address) {
        return Err(StoreError::InvalidAddress {
            line: Some(line_no),
            content: line.to_string(),
        });
    }

    let count: u32 = count.parse().map_err(|_| format_error())?;
    Ok((Address::normalize(address), count))
}

/// List file writer
pub struct ListFileWriter<W: Write> {
    writer: BufWriter<W>,
}

impl<W: Write> ListFileWriter<W> {
    /// Wrap any writer
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
        }
    }

    /// Write all four sections in fixed order: Mail, Removed, Returned, Extracted
    pub fn write_all(&mut self, lists: &ListSnapshot) -> Result<(), StoreError> {
        self.write_section(ListKind::Active, lists.active.iter().map(Address::as_str))?;
        self.write_section(ListKind::Removed, lists.removed.iter().map(Address::as_str))?;

        writeln!(self.writer, "{}", ListKind::Returned.header())?;
        for (addr, count) in &lists.returned {
            writeln!(self.writer, "{} {}", addr, count)?;
        }

        self.write_section(
            ListKind::Extracted,
            lists.extracted.iter().map(Address::as_str),
        )?;
        Ok(())
    }

    fn write_section<'a>(
        &mut self,
        kind: ListKind,
        entries: impl Iterator<Item = &'a str>,
    ) -> Result<(), StoreError> {
        writeln!(self.writer, "{}", kind.header())?;
        for entry in entries {
            writeln!(self.writer, "{}", entry)?;
        }
        Ok(())
    }

    /// Flush the buffer to the underlying writer
    pub fn flush(&mut self) -> Result<(), StoreError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Read a list file (convenience function)
pub fn read_lists(
    path: impl AsRef<Path>,
    pattern: &AddressPattern,
) -> Result<ListSnapshot, StoreError> {
    ListFileReader::open(path)?.read_all(pattern)
}

/// Parse list file contents held in memory
pub fn parse_lists(text: &str, pattern: &AddressPattern) -> Result<ListSnapshot, StoreError> {
    ListFileReader::new(text.as_bytes()).read_all(pattern)
}

/// Write a list file, replacing it only once the new contents are complete
///
/// Contents go to a temporary file in the same directory which is then renamed
/// over `path`, so a failed write leaves the previous file intact.
pub fn write_lists(path: impl AsRef<Path>, lists: &ListSnapshot) -> Result<(), StoreError> {
    let path = path.as_ref();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut staged = NamedTempFile::new_in(dir)?;
    {
        let mut writer = ListFileWriter::new(staged.as_file_mut());
        writer.write_all(lists)?;
        writer.flush()?;
    }
    staged.persist(path).map_err(|e| StoreError::Io(e.error))?;
    Ok(())
}

/// Render list file contents to a string
pub fn render_lists(lists: &ListSnapshot) -> String {
    let mut buf = Vec::new();
    {
        let mut writer = ListFileWriter::new(&mut buf);
        // Writing to a Vec cannot fail.
        let _ = writer.write_all(lists).and_then(|()| writer.flush());
    }
    String::from_utf8_lossy(&buf).into_owned()
}
