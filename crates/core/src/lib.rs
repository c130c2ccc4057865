//! Mangaba Core - Shared types library.
//!
//! This crate provides common types used across all Mangaba components:
//! - `storefront` - Cart, pricing, and checkout domain services
//! - `cli` - Command-line tools for migrations and order management
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, money, quantities, line
//!   items, and orders

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
