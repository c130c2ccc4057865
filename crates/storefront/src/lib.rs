//! Mangaba Storefront library.
//!
//! Cart, pricing, and checkout domain services for the Mangaba storefront.
//! The HTTP layer, UI, and admin panel live elsewhere; this crate owns the
//! business rules and talks to its collaborators (catalog, payment
//! processor, Postgres) through the seams in [`services`] and [`db`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod checkout;
pub mod config;
pub mod db;
pub mod error;
pub mod services;
