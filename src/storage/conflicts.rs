//! Resolving active/removed conflicts
//!
//! The store refuses any insert that would put an address in both the active
//! and removed lists and reports the conflicting subset. [`ConflictPolicy`]
//! names what a caller wants done with that subset, and the methods here
//! apply the policy and retry.

use super::address_store::AddressStore;
use super::error::{ListKind, StoreError};
use crate::mail::{normalize_all, Address};

/// What to do with addresses already held by the opposing list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConflictPolicy {
    /// Fail with the conflicting subset and change nothing
    #[default]
    Reject,

    /// Move the conflicting addresses across from the opposing list first
    Force,

    /// Leave the conflicting addresses out and file the rest
    Skip,
}

impl AddressStore {
    /// Add addresses to `target`, applying `policy` to conflicts
    ///
    /// Returns the conflicting addresses that were forced across or skipped.
    pub fn add_resolving<I, S>(
        &mut self,
        target: ListKind,
        addresses: I,
        policy: ConflictPolicy,
    ) -> Result<Vec<Address>, StoreError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let addresses = normalize_all(addresses);
        let conflicts = match self.add_to(target, &addresses) {
            Err(StoreError::MutualExclusion { conflicts, .. }) => conflicts,
            other => return other.map(|()| Vec::new()),
        };

        match policy {
            ConflictPolicy::Reject => {
                return Err(StoreError::MutualExclusion { target, conflicts });
            }
            ConflictPolicy::Force => {
                self.pull_across(target, &conflicts)?;
                self.add_to(target, &addresses)?;
            }
            ConflictPolicy::Skip => {
                let rest = addresses.iter().filter(|addr| !conflicts.contains(addr));
                self.add_to(target, rest)?;
            }
        }

        tracing::info!(%target, ?policy, resolved = conflicts.len(), "Resolved conflicting addresses");
        Ok(conflicts)
    }

    /// File every extracted address into `target`, applying `policy` to conflicts
    ///
    /// Skipped addresses are dropped from the extracted list. Returns the
    /// conflicting addresses that were forced across or skipped.
    pub fn move_extracted_resolving(
        &mut self,
        target: ListKind,
        policy: ConflictPolicy,
    ) -> Result<Vec<Address>, StoreError> {
        let conflicts = match self.move_extracted_to(target) {
            Err(StoreError::MutualExclusion { conflicts, .. }) => conflicts,
            other => return other.map(|()| Vec::new()),
        };

        match policy {
            ConflictPolicy::Reject => {
                return Err(StoreError::MutualExclusion { target, conflicts });
            }
            ConflictPolicy::Force => self.pull_across(target, &conflicts)?,
            ConflictPolicy::Skip => self.del_from_extracted(&conflicts),
        }
        self.move_extracted_to(target)?;

        tracing::info!(%target, ?policy, resolved = conflicts.len(), "Resolved conflicting addresses");
        Ok(conflicts)
    }

    /// Take `addresses` out of the list exclusive with `target` and into `target`
    fn pull_across(&mut self, target: ListKind, addresses: &[Address]) -> Result<(), StoreError> {
        match target {
            ListKind::Active => self.move_removed_to_active(addresses),
            ListKind::Removed => self.move_active_to_removed(addresses),
            ListKind::Returned | ListKind::Extracted => Ok(()),
        }
    }
}
