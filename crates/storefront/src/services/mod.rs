//! Clients for external service collaborators.
//!
//! The storefront core never owns catalog or payment data; it reaches both
//! through the traits defined here, which keeps the domain services testable
//! against in-memory fakes.

pub mod catalog;
pub mod payment;

pub use catalog::{CatalogError, HttpCatalogClient, ProductCatalog, ProductSnapshot};
pub use payment::{HttpPaymentClient, PaymentError, PaymentGateway, PaymentIntent};
