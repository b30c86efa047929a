//! # Relay Domain
//!
//! Data types shared by every Relay crate.
//!
//! This crate contains:
//! - Chat messages and per-call completion options
//! - Client configuration structures
//! - Error types: configuration errors and classified backend failures
//!
//! ## Architecture
//! - No dependencies on other Relay crates
//! - Only external dependencies allowed
//! - Pure data structures, no I/O

pub mod config;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
