//! Order management commands.
//!
//! Out-of-band payment methods (pix, boleto) have no processor callback:
//! the shopper pays against instructions and an operator confirms the
//! payment here once the money arrives. Card orders are confirmed by the
//! storefront's capture flow, not this command.

use secrecy::SecretString;

use mangaba_core::{OrderId, PaymentStatus};
use mangaba_storefront::db::{self, OrderStore, PgOrderStore, RepositoryError};

/// Errors that can occur in order commands.
#[derive(Debug, thiserror::Error)]
pub enum OrderCommandError {
    /// Required environment variable is not set.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// The order ID is not a valid UUID.
    #[error("Invalid order id: {0}")]
    InvalidOrderId(#[from] uuid::Error),

    /// Database connection failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Repository operation failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Mark an awaiting-payment order as paid.
///
/// # Errors
///
/// Returns `OrderCommandError` if the order ID is invalid, the database is
/// unreachable, or the order does not exist.
pub async fn confirm(order_id: &str, reference: Option<&str>) -> Result<(), OrderCommandError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("STOREFRONT_DATABASE_URL")
        .map_err(|_| OrderCommandError::MissingEnvVar("STOREFRONT_DATABASE_URL"))?;

    let id: OrderId = order_id.parse()?;

    let pool = db::create_pool(&SecretString::from(database_url)).await?;
    let store = PgOrderStore::new(pool);

    let order = store
        .get(&id)
        .await?
        .ok_or_else(|| RepositoryError::NotFound(format!("order {id}")))?;

    if order.payment_status == PaymentStatus::Paid {
        tracing::info!(order = %id, "Order is already paid; nothing to do");
        return Ok(());
    }

    store
        .update_payment_status(&id, PaymentStatus::Paid, reference)
        .await?;

    tracing::info!(
        order = %id,
        method = %order.payment_method,
        total = %order.total,
        "Payment confirmed"
    );
    Ok(())
}
