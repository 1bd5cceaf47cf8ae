//! Core types for Larkspur.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod credential;
pub mod id;
pub mod money;

pub use credential::SessionToken;
pub use id::*;
pub use money::{MoneyError, format_amount, parse_amount, unit_price};
