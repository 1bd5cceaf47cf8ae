//! Larkspur Core - Shared types library.
//!
//! This crate provides common types used across Larkspur components:
//! - `storefront` - Public-facing cart and checkout service
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access, no HTTP
//! clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, line keys, money
//!   parsing, and the opaque gateway session credential

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
