//! Handraise Shared Types
//!
//! This crate contains the domain types and errors shared across the
//! Handraise platform.

pub mod error;
pub mod types;

pub use error::*;
pub use types::*;
