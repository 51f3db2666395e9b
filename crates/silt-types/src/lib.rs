//! Foundation types for the Silt client.
//!
//! This crate provides the small value types shared by every other Silt
//! crate. Every other Silt crate depends on `silt-types`.
//!
//! # Key Types
//!
//! - [`Link`] — A typed, one-directional reference to another stored object
//! - [`IndexValue`] — A secondary-index value, binary or integer
//! - [`Quorum`] — A per-request consistency/durability setting
//! - [`TypeError`] — Validation failures raised before any network I/O

pub mod error;
pub mod ident;
pub mod index;
pub mod link;
pub mod quorum;

pub use error::TypeError;
pub use ident::ensure_ascii;
pub use index::{check_field_value, is_int_field, IndexValue};
pub use link::Link;
pub use quorum::Quorum;
