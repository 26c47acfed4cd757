//! Storage layer
//!
//! The address store, its change events, and the list file format it persists to.
//!
//! - [`AddressStore`]: the four collections, their invariants and every operation
//! - [`list_file`]: section-based text reader and writer
//! - [`ConflictPolicy`]: force or skip addresses held by the opposing list
//! - [`StoreEvent`]: data-changed / save-status-changed notifications
//! - [`StoreError`]: failure taxonomy shared by all of the above

mod address_store;
mod conflicts;
mod error;
mod events;
pub mod list_file;

pub use address_store::{AddressStore, StoreStats};
pub use conflicts::ConflictPolicy;
pub use error::{ListKind, StoreError};
pub use events::{EventBus, StoreEvent};
pub use list_file::{
    parse_lists, read_lists, render_lists, write_lists, ListFileReader, ListFileWriter,
    ListSnapshot,
};
