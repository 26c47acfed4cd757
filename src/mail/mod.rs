//! Mailing addresses
//!
//! The address type and the configurable rule that validates and extracts it.
//!
//! # Overview
//!
//! - [`Address`]: normalized, ordered address text
//! - [`AddressPattern`]: full-match validation and free-text extraction

mod address;
mod pattern;

pub use address::{normalize_all, Address};
pub use pattern::{AddressPattern, DEFAULT_ADDRESS_PATTERN};
