//! The address store
//!
//! Owns the four collections and the document state, and is the only place
//! that mutates them. Every mutating operation either applies completely and
//! notifies, or fails and leaves all collections untouched.
//!
//! # Invariants
//!
//! - No address is ever in both the active and removed lists
//! - Stored addresses are normalized (see [`Address`]) and match the pattern
//! - Bounce counts never go below zero
//! - The store is dirty exactly when content changed since the last load,
//!   save or reset
//!
//! # Example
//!
//! ```
//! use mailbase::mail::AddressPattern;
//! use mailbase::storage::{AddressStore, StoreError};
//!
//! let mut store = AddressStore::new(AddressPattern::default());
//! store.add_to_active(["Ann@Example.com"]).unwrap();
//!
//! let err = store.add_to_removed(["ann@example.com"]).unwrap_err();
//! assert!(matches!(err, StoreError::MutualExclusion { .. }));
//! assert_eq!(store.list_active().len(), 1);
//! ```

use super::error::{ListKind, StoreError};
use super::events::{EventBus, StoreEvent};
use super::list_file::{read_lists, write_lists, ListSnapshot};
use crate::mail::{normalize_all, Address, AddressPattern};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::sync::mpsc;

/// Collection sizes and document state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub active: usize,
    pub removed: usize,
    pub returned: usize,
    pub extracted: usize,
    pub dirty: bool,
    pub current_file: Option<PathBuf>,
}

/// Mailing-address database
///
/// Single-writer: callers embedding the store in a concurrent host must
/// serialize access themselves.
#[derive(Debug)]
pub struct AddressStore {
    pattern: AddressPattern,
    lists: ListSnapshot,
    current_file: Option<PathBuf>,
    dirty: bool,
    events: EventBus,
}

impl AddressStore {
    /// Create an empty, clean store with no current file
    pub fn new(pattern: AddressPattern) -> Self {
        Self {
            pattern,
            lists: ListSnapshot::default(),
            current_file: None,
            dirty: false,
            events: EventBus::new(),
        }
    }

    /// The rule used for validation and extraction
    pub fn pattern(&self) -> &AddressPattern {
        &self.pattern
    }

    /// Receive change events from now on
    pub fn subscribe(&mut self) -> mpsc::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    /// The file loaded from or last saved to
    pub fn current_file(&self) -> Option<&Path> {
        self.current_file.as_deref()
    }

    /// True if there are unsaved changes
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// True if everything is saved
    pub fn is_saved(&self) -> bool {
        !self.dirty
    }

    // --- document lifecycle ---

    /// Start a new, empty document
    pub fn reset(&mut self) {
        self.lists = ListSnapshot::default();
        self.current_file = None;
        self.dirty = false;

        tracing::info!("Started new address document");
        self.events.emit(StoreEvent::DataChanged);
        self.events.emit(StoreEvent::SaveStatusChanged);
    }

    /// Replace all collections with the contents of a list file
    ///
    /// On any error the store is left exactly as it was.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<(), StoreError> {
        let path = path.as_ref();
        tracing::info!(path = %path.display(), "Loading address lists");

        let lists = read_lists(path, &self.pattern).inspect_err(|e| {
            tracing::warn!(path = %path.display(), error = %e, "Failed to load address lists");
        })?;

        tracing::debug!(
            active = lists.active.len(),
            removed = lists.removed.len(),
            returned = lists.returned.len(),
            extracted = lists.extracted.len(),
            "Address lists loaded"
        );

        self.lists = lists;
        self.current_file = Some(path.to_path_buf());
        self.dirty = false;
        self.events.emit(StoreEvent::DataChanged);
        self.events.emit(StoreEvent::SaveStatusChanged);
        Ok(())
    }

    /// Write all collections to the current file
    pub fn save(&mut self) -> Result<(), StoreError> {
        let path = self.current_file.clone().ok_or(StoreError::NoCurrentFile)?;

        write_lists(&path, &self.lists)?;
        tracing::info!(path = %path.display(), "Saved address lists");

        if self.dirty {
            self.dirty = false;
            self.events.emit(StoreEvent::SaveStatusChanged);
        }
        Ok(())
    }

    /// Make `path` the current file and save to it
    ///
    /// If writing fails, the previous current file is kept.
    pub fn save_as(&mut self, path: impl Into<PathBuf>) -> Result<(), StoreError> {
        let previous = self.current_file.replace(path.into());

        if let Err(e) = self.save() {
            self.current_file = previous;
            return Err(e);
        }

        self.events.emit(StoreEvent::SaveStatusChanged);
        Ok(())
    }

    // --- active / removed ---

    /// Add addresses to the active list
    ///
    /// Fails without changing anything if any address is already removed.
    pub fn add_to_active<I, S>(&mut self, addresses: I) -> Result<(), StoreError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let addresses = self.accept(addresses)?;
        let changed = self.insert_into(ListKind::Active, addresses)?;
        self.commit(changed);
        Ok(())
    }

    /// Add addresses to the removed list
    ///
    /// Fails without changing anything if any address is already active.
    pub fn add_to_removed<I, S>(&mut self, addresses: I) -> Result<(), StoreError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let addresses = self.accept(addresses)?;
        let changed = self.insert_into(ListKind::Removed, addresses)?;
        self.commit(changed);
        Ok(())
    }

    /// Delete addresses from the active list; absent addresses are ignored
    pub fn del_from_active<I, S>(&mut self, addresses: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let changed = remove_all(&mut self.lists.active, &normalize_all(addresses));
        self.commit(changed);
    }

    /// Delete addresses from the removed list; absent addresses are ignored
    pub fn del_from_removed<I, S>(&mut self, addresses: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let changed = remove_all(&mut self.lists.removed, &normalize_all(addresses));
        self.commit(changed);
    }

    /// Move addresses from active to removed
    ///
    /// Cannot conflict, since each address leaves the active list first.
    pub fn move_active_to_removed<I, S>(&mut self, addresses: I) -> Result<(), StoreError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let addresses = self.accept(addresses)?;
        let mut changed = remove_all(&mut self.lists.active, &addresses);
        changed |= insert_all(&mut self.lists.removed, addresses);
        self.commit(changed);
        Ok(())
    }

    /// Move addresses from removed to active
    ///
    /// Cannot conflict, since each address leaves the removed list first.
    pub fn move_removed_to_active<I, S>(&mut self, addresses: I) -> Result<(), StoreError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let addresses = self.accept(addresses)?;
        let mut changed = remove_all(&mut self.lists.removed, &addresses);
        changed |= insert_all(&mut self.lists.active, addresses);
        self.commit(changed);
        Ok(())
    }

    // --- returned ---

    /// Record addresses as returned: new entries start at 0, existing ones go up by 1
    pub fn add_to_returned<I, S>(&mut self, addresses: I) -> Result<(), StoreError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let addresses = self.accept(addresses)?;
        let changed = self.bump_returned(addresses, 0);
        self.commit(changed);
        Ok(())
    }

    /// Count a bounce: new entries start at 1, existing ones go up by 1
    pub fn increment_returned<I, S>(&mut self, addresses: I) -> Result<(), StoreError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let addresses = self.accept(addresses)?;
        let changed = self.bump_returned(addresses, 1);
        self.commit(changed);
        Ok(())
    }

    /// Lower bounce counts by 1, never below 0
    ///
    /// Every address must already be in the returned list, otherwise nothing
    /// changes and the first missing address is reported.
    pub fn decrement_returned<I, S>(&mut self, addresses: I) -> Result<(), StoreError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let addresses = normalize_all(addresses);
        if let Some(missing) = addresses
            .iter()
            .find(|addr| !self.lists.returned.contains_key(*addr))
        {
            return Err(StoreError::NotFound(missing.clone()));
        }

        let mut changed = false;
        for addr in &addresses {
            if let Some(count) = self.lists.returned.get_mut(addr) {
                if *count > 0 {
                    *count -= 1;
                    changed = true;
                }
            }
        }

        self.commit(changed);
        Ok(())
    }

    /// Delete addresses from the returned list; absent addresses are ignored
    pub fn del_from_returned<I, S>(&mut self, addresses: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut changed = false;
        for addr in normalize_all(addresses) {
            changed |= self.lists.returned.remove(&addr).is_some();
        }
        self.commit(changed);
    }

    /// Retire every address bounced more than `threshold` times
    ///
    /// Qualifying addresses leave the active and returned lists and join the
    /// removed list. Returns the retired addresses in order.
    pub fn process_returned(&mut self, threshold: NonZeroU32) -> Vec<Address> {
        let retired: BTreeSet<Address> = self
            .lists
            .returned
            .iter()
            .filter(|(_, count)| **count > threshold.get())
            .map(|(addr, _)| addr.clone())
            .collect();

        if retired.is_empty() {
            return Vec::new();
        }

        remove_all(&mut self.lists.active, &retired);
        for addr in &retired {
            self.lists.returned.remove(addr);
        }
        insert_all(&mut self.lists.removed, retired.iter().cloned());

        tracing::info!(threshold = threshold.get(), retired = retired.len(), "Processed returned addresses");
        self.commit(true);
        retired.into_iter().collect()
    }

    // --- extracted ---

    /// Replace the extracted list with every address found in `text`
    ///
    /// Returns the number of matches, counting repeats.
    pub fn extract_addresses(&mut self, text: &str) -> usize {
        let found = self.pattern.find_all(text);
        let count = found.len();
        let extracted: BTreeSet<Address> = found.into_iter().collect();

        tracing::debug!(matches = count, unique = extracted.len(), "Extracted addresses from text");

        let changed = extracted != self.lists.extracted;
        self.lists.extracted = extracted;
        self.commit(changed);
        count
    }

    /// Extract addresses from a text file, treating line breaks as spaces
    pub fn extract_from_file(&mut self, path: impl AsRef<Path>) -> Result<usize, StoreError> {
        let content = fs::read_to_string(path)?;
        let text = content.lines().collect::<Vec<_>>().join(" ");
        Ok(self.extract_addresses(&text))
    }

    /// Add addresses to the extracted list by hand
    pub fn add_to_extracted<I, S>(&mut self, addresses: I) -> Result<(), StoreError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let addresses = self.accept(addresses)?;
        let changed = self.insert_into(ListKind::Extracted, addresses)?;
        self.commit(changed);
        Ok(())
    }

    /// Delete addresses from the extracted list; absent addresses are ignored
    pub fn del_from_extracted<I, S>(&mut self, addresses: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let changed = remove_all(&mut self.lists.extracted, &normalize_all(addresses));
        self.commit(changed);
    }

    /// Empty the extracted list
    pub fn clear_extracted(&mut self) {
        let changed = !self.lists.extracted.is_empty();
        self.lists.extracted.clear();
        self.commit(changed);
    }

    /// File every extracted address into the active list
    ///
    /// On a mutual-exclusion conflict the extracted list is left intact and the
    /// conflicting subset is returned in the error.
    pub fn move_extracted_to_active(&mut self) -> Result<(), StoreError> {
        self.move_extracted_exclusive(ListKind::Active)
    }

    /// File every extracted address into the removed list
    ///
    /// On a mutual-exclusion conflict the extracted list is left intact and the
    /// conflicting subset is returned in the error.
    pub fn move_extracted_to_removed(&mut self) -> Result<(), StoreError> {
        self.move_extracted_exclusive(ListKind::Removed)
    }

    /// Count a bounce for every extracted address, then empty the extracted list
    pub fn move_extracted_to_returned(&mut self) {
        if self.lists.extracted.is_empty() {
            return;
        }
        let extracted = std::mem::take(&mut self.lists.extracted);
        self.bump_returned(extracted, 1);
        self.commit(true);
    }

    // --- by list kind ---

    /// Add addresses to any list, with that list's own semantics
    ///
    /// Returned entries go through [`add_to_returned`](Self::add_to_returned).
    pub fn add_to<I, S>(&mut self, kind: ListKind, addresses: I) -> Result<(), StoreError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        match kind {
            ListKind::Active => self.add_to_active(addresses),
            ListKind::Removed => self.add_to_removed(addresses),
            ListKind::Returned => self.add_to_returned(addresses),
            ListKind::Extracted => self.add_to_extracted(addresses),
        }
    }

    /// Delete addresses from any list
    pub fn del_from<I, S>(&mut self, kind: ListKind, addresses: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        match kind {
            ListKind::Active => self.del_from_active(addresses),
            ListKind::Removed => self.del_from_removed(addresses),
            ListKind::Returned => self.del_from_returned(addresses),
            ListKind::Extracted => self.del_from_extracted(addresses),
        }
    }

    /// File every extracted address into `kind`
    ///
    /// Filing into the extracted list itself changes nothing.
    pub fn move_extracted_to(&mut self, kind: ListKind) -> Result<(), StoreError> {
        match kind {
            ListKind::Active => self.move_extracted_to_active(),
            ListKind::Removed => self.move_extracted_to_removed(),
            ListKind::Returned => {
                self.move_extracted_to_returned();
                Ok(())
            }
            ListKind::Extracted => Ok(()),
        }
    }

    // --- queries ---

    /// Active addresses in lexicographic order
    pub fn list_active(&self) -> Vec<Address> {
        self.lists.active.iter().cloned().collect()
    }

    /// Removed addresses in lexicographic order
    pub fn list_removed(&self) -> Vec<Address> {
        self.lists.removed.iter().cloned().collect()
    }

    /// Returned addresses with their counts, ordered by address
    pub fn list_returned(&self) -> Vec<(Address, u32)> {
        self.lists
            .returned
            .iter()
            .map(|(addr, count)| (addr.clone(), *count))
            .collect()
    }

    /// Extracted addresses in lexicographic order
    pub fn list_extracted(&self) -> Vec<Address> {
        self.lists.extracted.iter().cloned().collect()
    }

    /// One list's addresses joined by `separator`, for pasting elsewhere
    ///
    /// Returned entries contribute their address only.
    pub fn join_list(&self, kind: ListKind, separator: &str) -> String {
        self.lists
            .addresses(kind)
            .into_iter()
            .map(Address::as_str)
            .collect::<Vec<_>>()
            .join(separator)
    }

    /// Bounce count for one address
    pub fn return_count(&self, address: &str) -> Result<u32, StoreError> {
        let addr = Address::normalize(address);
        self.lists
            .returned
            .get(&addr)
            .copied()
            .ok_or(StoreError::NotFound(addr))
    }

    /// Copy of all four collections
    pub fn snapshot(&self) -> ListSnapshot {
        self.lists.clone()
    }

    /// Collection sizes and document state
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            active: self.lists.active.len(),
            removed: self.lists.removed.len(),
            returned: self.lists.returned.len(),
            extracted: self.lists.extracted.len(),
            dirty: self.dirty,
            current_file: self.current_file.clone(),
        }
    }

    // --- internals ---

    /// Normalize caller input and reject anything the pattern does not accept
    fn accept<I, S>(&self, addresses: I) -> Result<BTreeSet<Address>, StoreError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let addresses = normalize_all(addresses);
        if let Some(bad) = addresses
            .iter()
            .find(|addr| !self.pattern.matches(addr.as_str()))
        {
            tracing::debug!(address = %bad, "Rejected input not matching the address pattern");
            return Err(StoreError::InvalidAddress {
                line: None,
                content: bad.to_string(),
            });
        }
        Ok(addresses)
    }

    /// Check-then-insert into a set list, without notifying
    ///
    /// Fails with the conflicting subset if `target` has an exclusive partner
    /// already holding any of the addresses.
    fn insert_into(
        &mut self,
        target: ListKind,
        addresses: BTreeSet<Address>,
    ) -> Result<bool, StoreError> {
        if let Some(opposing) = target.exclusive_with() {
            let conflicts: Vec<Address> = addresses
                .iter()
                .filter(|addr| self.lists.contains(opposing, addr))
                .cloned()
                .collect();
            if !conflicts.is_empty() {
                tracing::debug!(%target, conflicts = conflicts.len(), "Rejected insert violating exclusivity");
                return Err(StoreError::MutualExclusion { target, conflicts });
            }
        }

        let mut changed = false;
        for addr in addresses {
            changed |= self.lists.insert(target, addr);
        }
        Ok(changed)
    }

    fn move_extracted_exclusive(&mut self, target: ListKind) -> Result<(), StoreError> {
        if self.lists.extracted.is_empty() {
            return Ok(());
        }

        let staged = self.lists.extracted.clone();
        self.insert_into(target, staged)?;
        self.lists.extracted.clear();
        self.commit(true);
        Ok(())
    }

    /// Increment existing counts, inserting absent addresses at `initial`
    fn bump_returned(&mut self, addresses: BTreeSet<Address>, initial: u32) -> bool {
        let changed = !addresses.is_empty();
        for addr in addresses {
            self.lists
                .returned
                .entry(addr)
                .and_modify(|count| *count = count.saturating_add(1))
                .or_insert(initial);
        }
        changed
    }

    /// Announce a content change and mark the document dirty
    fn commit(&mut self, changed: bool) {
        if !changed {
            return;
        }

        tracing::debug!(
            active = self.lists.active.len(),
            removed = self.lists.removed.len(),
            returned = self.lists.returned.len(),
            extracted = self.lists.extracted.len(),
            "Collections updated"
        );
        self.events.emit(StoreEvent::DataChanged);

        if !self.dirty {
            self.dirty = true;
            self.events.emit(StoreEvent::SaveStatusChanged);
        }
    }
}

impl Default for AddressStore {
    fn default() -> Self {
        Self::new(AddressPattern::default())
    }
}

fn insert_all(set: &mut BTreeSet<Address>, addresses: impl IntoIterator<Item = Address>) -> bool {
    let mut changed = false;
    for addr in addresses {
        changed |= set.insert(addr);
    }
    changed
}

fn remove_all(set: &mut BTreeSet<Address>, addresses: &BTreeSet<Address>) -> bool {
    let before = set.len();
    set.retain(|addr| !addresses.contains(addr));
    set.len() != before
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> AddressStore {
        AddressStore::default()
    }

    fn texts(addrs: &[Address]) -> Vec<&str> {
        addrs.iter().map(Address::as_str).collect()
    }

    fn drain(rx: &mpsc::Receiver<StoreEvent>) -> Vec<StoreEvent> {
        rx.try_iter().collect()
    }

    fn nz(n: u32) -> NonZeroU32 {
        NonZeroU32::new(n).unwrap()
    }

    #[test]
    fn test_new_store_is_clean_and_empty() {
        let store = store();
        assert!(store.is_saved());
        assert!(store.current_file().is_none());
        assert!(store.snapshot().is_empty());
    }

    #[test]
    fn test_add_to_active_normalizes_and_dedups() {
        let mut store = store();
        store.add_to_active(["B@x.com", "a@X.com", "b@x.com"]).unwrap();

        assert_eq!(texts(&store.list_active()), vec!["a@x.com", "b@x.com"]);
        assert!(store.is_dirty());
    }

    #[test]
    fn test_add_to_removed_conflict_is_atomic() {
        let mut store = store();
        store.add_to_active(["a@x.com"]).unwrap();

        let err = store.add_to_removed(["A@x.com", "new@x.com"]).unwrap_err();
        match &err {
            StoreError::MutualExclusion { target, conflicts } => {
                assert_eq!(*target, ListKind::Removed);
                assert_eq!(texts(conflicts), vec!["a@x.com"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        assert_eq!(texts(&store.list_active()), vec!["a@x.com"]);
        assert!(store.list_removed().is_empty());
    }

    #[test]
    fn test_add_to_active_conflict() {
        let mut store = store();
        store.add_to_removed(["r@x.com", "s@x.com"]).unwrap();

        let err = store.add_to_active(["s@x.com", "r@x.com", "t@x.com"]).unwrap_err();
        assert_eq!(err.conflicts().map(texts), Some(vec!["r@x.com", "s@x.com"]));
        assert!(store.list_active().is_empty());
    }

    #[test]
    fn test_failed_add_does_not_notify() {
        let mut store = store();
        store.add_to_active(["a@x.com"]).unwrap();
        let rx = store.subscribe();

        assert!(store.add_to_removed(["a@x.com"]).is_err());
        assert!(drain(&rx).is_empty());
    }

    #[test]
    fn test_delete_is_idempotent() {
        let mut store = store();
        store.add_to_active(["a@x.com", "b@x.com"]).unwrap();

        store.del_from_active(["A@x.com"]);
        let once = store.snapshot();
        store.del_from_active(["a@x.com"]);

        assert_eq!(store.snapshot(), once);
        assert_eq!(texts(&store.list_active()), vec!["b@x.com"]);
    }

    #[test]
    fn test_delete_absent_is_noop() {
        let mut store = store();
        let rx = store.subscribe();

        store.del_from_active(["ghost@x.com"]);
        store.del_from_removed(["ghost@x.com"]);
        store.del_from_returned(["ghost@x.com"]);
        store.del_from_extracted(["ghost@x.com"]);

        assert!(store.is_saved());
        assert!(drain(&rx).is_empty());
    }

    #[test]
    fn test_move_between_active_and_removed() {
        let mut store = store();
        store.add_to_active(["a@x.com", "b@x.com"]).unwrap();

        store.move_active_to_removed(["A@X.COM"]).unwrap();
        assert_eq!(texts(&store.list_active()), vec!["b@x.com"]);
        assert_eq!(texts(&store.list_removed()), vec!["a@x.com"]);

        store.move_removed_to_active(["a@x.com"]).unwrap();
        assert_eq!(texts(&store.list_active()), vec!["a@x.com", "b@x.com"]);
        assert!(store.list_removed().is_empty());
    }

    #[test]
    fn test_add_to_returned_starts_at_zero() {
        let mut store = store();
        store.add_to_returned(["p@q.com"]).unwrap();
        assert_eq!(store.return_count("p@q.com").unwrap(), 0);

        store.add_to_returned(["P@Q.com"]).unwrap();
        assert_eq!(store.return_count("p@q.com").unwrap(), 1);
    }

    #[test]
    fn test_increment_returned_starts_at_one() {
        let mut store = store();
        store.increment_returned(["p@q.com"]).unwrap();
        assert_eq!(store.return_count("p@q.com").unwrap(), 1);

        store.increment_returned(["p@q.com"]).unwrap();
        assert_eq!(store.return_count("p@q.com").unwrap(), 2);
    }

    #[test]
    fn test_decrement_never_below_zero() {
        let mut store = store();
        store.add_to_returned(["p@q.com"]).unwrap();

        store.decrement_returned(["p@q.com"]).unwrap();
        assert_eq!(store.return_count("p@q.com").unwrap(), 0);
    }

    #[test]
    fn test_decrement_absent_fails_atomically() {
        let mut store = store();
        store.increment_returned(["p@q.com"]).unwrap();

        let err = store.decrement_returned(["p@q.com", "ghost@x.com"]).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(ref a) if a.as_str() == "ghost@x.com"));
        assert_eq!(store.return_count("p@q.com").unwrap(), 1);
    }

    #[test]
    fn test_return_count_missing() {
        let store = store();
        assert!(matches!(
            store.return_count("nobody@x.com"),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_process_returned_strictly_greater() {
        let mut store = store();
        store.add_to_active(["p@q.com", "r@s.com"]).unwrap();
        for _ in 0..3 {
            store.increment_returned(["p@q.com"]).unwrap();
        }
        for _ in 0..2 {
            store.increment_returned(["r@s.com"]).unwrap();
        }

        let retired = store.process_returned(nz(2));

        assert_eq!(texts(&retired), vec!["p@q.com"]);
        assert_eq!(texts(&store.list_active()), vec!["r@s.com"]);
        assert_eq!(texts(&store.list_removed()), vec!["p@q.com"]);
        assert_eq!(store.list_returned(), vec![(Address::normalize("r@s.com"), 2)]);
    }

    #[test]
    fn test_process_returned_noop_does_not_notify() {
        let mut store = store();
        store.increment_returned(["p@q.com"]).unwrap();
        let rx = store.subscribe();

        assert!(store.process_returned(nz(5)).is_empty());
        assert!(drain(&rx).is_empty());
    }

    #[test]
    fn test_extract_replaces_previous() {
        let mut store = store();
        store.add_to_extracted(["old@x.com"]).unwrap();

        let count = store.extract_addresses("contact a@b.com or c@d.com!!");

        assert_eq!(count, 2);
        assert_eq!(texts(&store.list_extracted()), vec!["a@b.com", "c@d.com"]);
    }

    #[test]
    fn test_extract_counts_repeats() {
        let mut store = store();
        let count = store.extract_addresses("A@B.com, a@b.com and a@b.com");
        assert_eq!(count, 3);
        assert_eq!(texts(&store.list_extracted()), vec!["a@b.com"]);
    }

    #[test]
    fn test_extract_nothing_from_empty_is_noop() {
        let mut store = store();
        let rx = store.subscribe();

        assert_eq!(store.extract_addresses("no addresses here"), 0);
        assert!(store.is_saved());
        assert!(drain(&rx).is_empty());
    }

    #[test]
    fn test_extract_nothing_clears_nonempty() {
        let mut store = store();
        store.add_to_extracted(["old@x.com"]).unwrap();

        assert_eq!(store.extract_addresses("nothing"), 0);
        assert!(store.list_extracted().is_empty());
        assert!(store.is_dirty());
    }

    #[test]
    fn test_extract_from_file_joins_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mailbox.txt");
        fs::write(&path, "From: a@b.com\nCc: c@d.com\n").unwrap();

        let mut store = store();
        assert_eq!(store.extract_from_file(&path).unwrap(), 2);
        assert_eq!(texts(&store.list_extracted()), vec!["a@b.com", "c@d.com"]);
    }

    #[test]
    fn test_extract_from_missing_file() {
        let mut store = store();
        store.add_to_extracted(["keep@x.com"]).unwrap();

        let err = store.extract_from_file("/nonexistent/mailbox.txt").unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));
        assert_eq!(texts(&store.list_extracted()), vec!["keep@x.com"]);
    }

    #[test]
    fn test_move_extracted_to_active() {
        let mut store = store();
        store.add_to_extracted(["a@x.com", "b@x.com"]).unwrap();

        store.move_extracted_to_active().unwrap();

        assert_eq!(texts(&store.list_active()), vec!["a@x.com", "b@x.com"]);
        assert!(store.list_extracted().is_empty());
    }

    #[test]
    fn test_move_extracted_conflict_keeps_extracted() {
        let mut store = store();
        store.add_to_removed(["b@x.com"]).unwrap();
        store.add_to_extracted(["a@x.com", "b@x.com"]).unwrap();

        let err = store.move_extracted_to_active().unwrap_err();
        assert_eq!(err.conflicts().map(texts), Some(vec!["b@x.com"]));
        assert_eq!(texts(&store.list_extracted()), vec!["a@x.com", "b@x.com"]);
        assert!(store.list_active().is_empty());

        // Caller resolves by dropping the conflicting subset, then retries.
        store.del_from_extracted(["b@x.com"]);
        store.move_extracted_to_active().unwrap();
        assert_eq!(texts(&store.list_active()), vec!["a@x.com"]);
        assert!(store.list_extracted().is_empty());
    }

    #[test]
    fn test_move_extracted_to_removed_after_force() {
        let mut store = store();
        store.add_to_active(["a@x.com"]).unwrap();
        store.add_to_extracted(["a@x.com", "b@x.com"]).unwrap();

        let err = store.move_extracted_to_removed().unwrap_err();
        let conflicts = err.conflicts().unwrap().to_vec();

        store.move_active_to_removed(&conflicts).unwrap();
        store.move_extracted_to_removed().unwrap();

        assert!(store.list_active().is_empty());
        assert_eq!(texts(&store.list_removed()), vec!["a@x.com", "b@x.com"]);
    }

    #[test]
    fn test_move_extracted_to_returned_uses_increment() {
        let mut store = store();
        store.increment_returned(["a@x.com"]).unwrap();
        store.add_to_extracted(["a@x.com", "b@x.com"]).unwrap();

        store.move_extracted_to_returned();

        assert_eq!(store.return_count("a@x.com").unwrap(), 2);
        assert_eq!(store.return_count("b@x.com").unwrap(), 1);
        assert!(store.list_extracted().is_empty());
    }

    #[test]
    fn test_clear_extracted() {
        let mut store = store();
        store.add_to_extracted(["a@x.com"]).unwrap();
        store.clear_extracted();
        assert!(store.list_extracted().is_empty());
    }

    #[test]
    fn test_extracted_not_exclusive() {
        let mut store = store();
        store.add_to_active(["a@x.com"]).unwrap();
        store.add_to_extracted(["a@x.com"]).unwrap();
        store.add_to_returned(["a@x.com"]).unwrap();

        assert_eq!(store.stats().active, 1);
        assert_eq!(store.stats().extracted, 1);
        assert_eq!(store.stats().returned, 1);
    }

    #[test]
    fn test_dirty_transition_notifies_once() {
        let mut store = store();
        let rx = store.subscribe();

        store.add_to_active(["a@x.com"]).unwrap();
        store.add_to_active(["b@x.com"]).unwrap();

        assert_eq!(
            drain(&rx),
            vec![
                StoreEvent::DataChanged,
                StoreEvent::SaveStatusChanged,
                StoreEvent::DataChanged,
            ]
        );
    }

    #[test]
    fn test_reset_clears_everything() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("lists.mbl");

        let mut store = store();
        store.add_to_active(["a@x.com"]).unwrap();
        store.save_as(&path).unwrap();
        store.add_to_removed(["r@x.com"]).unwrap();
        let rx = store.subscribe();

        store.reset();

        assert!(store.snapshot().is_empty());
        assert!(store.current_file().is_none());
        assert!(store.is_saved());
        assert_eq!(
            drain(&rx),
            vec![StoreEvent::DataChanged, StoreEvent::SaveStatusChanged]
        );
    }

    #[test]
    fn test_save_without_file() {
        let mut store = store();
        store.add_to_active(["a@x.com"]).unwrap();
        assert!(matches!(store.save(), Err(StoreError::NoCurrentFile)));
        assert!(store.is_dirty());
    }

    #[test]
    fn test_save_as_then_save() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("lists.mbl");

        let mut store = store();
        store.add_to_active(["a@x.com"]).unwrap();
        let rx = store.subscribe();

        store.save_as(&path).unwrap();
        assert!(store.is_saved());
        assert_eq!(store.current_file(), Some(path.as_path()));
        assert_eq!(
            drain(&rx),
            vec![StoreEvent::SaveStatusChanged, StoreEvent::SaveStatusChanged]
        );

        // Clean save writes but does not announce anything.
        store.save().unwrap();
        assert!(drain(&rx).is_empty());
    }

    #[test]
    fn test_save_as_failure_keeps_previous_file() {
        let dir = TempDir::new().unwrap();
        let good = dir.path().join("lists.mbl");
        let bad = dir.path().join("missing-dir").join("lists.mbl");

        let mut store = store();
        store.save_as(&good).unwrap();
        store.add_to_active(["a@x.com"]).unwrap();

        assert!(matches!(store.save_as(&bad), Err(StoreError::Io(_))));
        assert_eq!(store.current_file(), Some(good.as_path()));
        assert!(store.is_dirty());
    }

    #[test]
    fn test_load_replaces_wholesale() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("lists.mbl");
        fs::write(&path, "[Mail]\nnew@x.com\n").unwrap();

        let mut store = store();
        store.add_to_active(["old@x.com"]).unwrap();
        store.add_to_extracted(["staged@x.com"]).unwrap();

        store.load(&path).unwrap();

        assert_eq!(texts(&store.list_active()), vec!["new@x.com"]);
        assert!(store.list_extracted().is_empty());
        assert!(store.is_saved());
        assert_eq!(store.current_file(), Some(path.as_path()));
    }

    #[test]
    fn test_load_failure_keeps_state() {
        let dir = TempDir::new().unwrap();
        let good = dir.path().join("good.mbl");
        let bad = dir.path().join("bad.mbl");
        fs::write(&good, "[Mail]\na@x.com\n[Returned]\np@q.com 1\n").unwrap();
        fs::write(&bad, "[Mail]\nz@x.com\n[Returned]\nbad@x.com notanumber\n").unwrap();

        let mut store = store();
        store.load(&good).unwrap();
        let before = store.snapshot();
        let rx = store.subscribe();

        let err = store.load(&bad).unwrap_err();

        assert!(matches!(err, StoreError::InvalidFileFormat { line: 4, .. }));
        assert_eq!(store.snapshot(), before);
        assert_eq!(store.current_file(), Some(good.as_path()));
        assert!(drain(&rx).is_empty());
    }

    #[test]
    fn test_inserts_reject_addresses_the_pattern_rejects() {
        let mut store = store();
        store.add_to_active(["a@x.com"]).unwrap();
        let before = store.snapshot();
        let rx = store.subscribe();

        let err = store.move_active_to_removed(["a@x.com", "Not An Address"]).unwrap_err();
        assert!(matches!(
            err,
            StoreError::InvalidAddress { line: None, ref content } if content == "not an address"
        ));
        assert!(store.increment_returned(["x y"]).is_err());
        assert!(store.add_to_returned(["nobody"]).is_err());
        assert!(store.add_to_extracted(["@@"]).is_err());
        assert!(store.add_to_removed(["b@x.com", "b at x"]).is_err());
        assert!(store.move_removed_to_active(["plain"]).is_err());

        assert_eq!(store.snapshot(), before);
        assert!(drain(&rx).is_empty());
    }

    #[test]
    fn test_saved_file_reloads_after_rejected_inserts() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("lists.mbl");

        let mut store = store();
        store.add_to_active(["a@x.com"]).unwrap();
        let _ = store.move_active_to_removed(["not an address"]);
        let _ = store.increment_returned(["x y"]);
        store.save_as(&path).unwrap();

        let mut reloaded = AddressStore::default();
        reloaded.load(&path).unwrap();
        assert_eq!(reloaded.snapshot(), store.snapshot());
    }

    #[test]
    fn test_custom_pattern_governs_inserts() {
        let pattern = AddressPattern::new(r"[a-z]+@corp\.internal").unwrap();
        let mut store = AddressStore::new(pattern);

        store.add_to_active(["Ops@Corp.Internal"]).unwrap();
        assert!(store.add_to_active(["ops@example.com"]).is_err());
        assert_eq!(texts(&store.list_active()), vec!["ops@corp.internal"]);
    }

    #[test]
    fn test_dispatch_by_kind() {
        let mut store = store();
        for kind in ListKind::ALL {
            store.add_to(kind, [format!("{}@x.com", kind)]).unwrap();
        }
        assert_eq!(store.return_count("returned@x.com").unwrap(), 0);
        assert_eq!(texts(&store.list_removed()), vec!["removed@x.com"]);

        store.del_from(ListKind::Active, ["active@x.com"]);
        assert!(store.list_active().is_empty());

        store.move_extracted_to(ListKind::Extracted).unwrap();
        assert_eq!(texts(&store.list_extracted()), vec!["extracted@x.com"]);
        store.move_extracted_to(ListKind::Returned).unwrap();
        assert_eq!(store.return_count("extracted@x.com").unwrap(), 1);
        assert!(store.list_extracted().is_empty());
    }

    #[test]
    fn test_join_list() {
        let mut store = store();
        store.add_to_active(["b@x.com", "a@x.com"]).unwrap();
        store.increment_returned(["p@q.com"]).unwrap();

        assert_eq!(store.join_list(ListKind::Active, "; "), "a@x.com; b@x.com");
        assert_eq!(store.join_list(ListKind::Returned, ","), "p@q.com");
        assert_eq!(store.join_list(ListKind::Removed, ","), "");
    }
}
