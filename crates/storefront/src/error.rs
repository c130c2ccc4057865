//! Unified error handling for storefront operations.
//!
//! Provides a unified `AppError` type aggregating the module-level error
//! enums. Cart and checkout operations return `Result<T, AppError>`; the
//! caller closest to the shopper turns it into a user-visible message.

use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::catalog::CatalogError;
use crate::services::payment::PaymentError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Caller passed invalid input (quantity below one, empty cart at
    /// checkout, blank product reference).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Operation requires an authenticated shopper.
    #[error("Not authenticated: {0}")]
    NotAuthenticated(String),

    /// Cart or order persistence failed.
    #[error("Persistence error: {0}")]
    Persistence(#[from] RepositoryError),

    /// Catalog lookup failed.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Payment collaborator failed.
    #[error("Payment error: {0}")]
    Payment(#[from] PaymentError),
}

impl AppError {
    /// Whether the failure came from an external collaborator rather than
    /// from caller input.
    ///
    /// Collaborator failures are logged at the boundary; input errors are
    /// only shown to the shopper.
    #[must_use]
    pub const fn is_collaborator_failure(&self) -> bool {
        matches!(
            self,
            Self::Persistence(_) | Self::Catalog(_) | Self::Payment(_)
        )
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
