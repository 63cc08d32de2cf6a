//! Shared foundational types used across the Strata hardware toolkit.
//!
//! This crate provides two-state bit vectors used for every signal value,
//! interned identifiers, content hashing, and frequency values for clocks.

#![warn(missing_docs)]

pub mod bits;
pub mod frequency;
pub mod hash;
pub mod ident;

pub use bits::{Bits, ParseBitsError};
pub use frequency::{Frequency, ParseFrequencyError};
pub use hash::{ContentHash, ContentHasher};
pub use ident::{Ident, Interner};
