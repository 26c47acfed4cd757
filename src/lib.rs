//! Mailbase - mailing-address database
//!
//! Mailbase keeps a mailing list split across four collections and the rules
//! that tie them together:
//!
//! - **Active**: addresses that receive mail
//! - **Removed**: addresses excluded from mailing, never also active
//! - **Returned**: addresses with a bounce count
//! - **Extracted**: a staging area filled by scanning free-form text
//!
//! # Architecture
//!
//! - **mail**: the normalized `Address` type and the configurable `AddressPattern`
//! - **storage**: `AddressStore`, its change events and the list file format
//! - **config**: YAML configuration (address pattern, defaults) and validation
//! - **logging**: tracing subscriber setup
//!
//! The store is single-writer and synchronous. It announces changes through
//! [`storage::StoreEvent`] subscriptions and never renders anything itself.

// Core modules
pub mod config;
pub mod error;
pub mod mail;
pub mod storage;

// Support
pub mod logging;

// Re-exports
pub use error::{MailbaseError, Result};
pub use mail::{Address, AddressPattern};
pub use storage::{AddressStore, ConflictPolicy, ListKind, StoreError, StoreEvent};
