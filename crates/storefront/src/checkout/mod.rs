//! Checkout orchestration.
//!
//! Turns the current cart into an order. Totals are always recomputed
//! server-side from the cart snapshot - a client-cached total is never
//! trusted. Order existence is deliberately decoupled from payment
//! completion: the cart is cleared when the order is created, and a payment
//! that later fails leaves the order `awaiting_payment` without restoring
//! the cart.

use rust_decimal::Decimal;

use mangaba_core::{
    LineItem, Money, NewOrder, Order, OrderId, OrderItem, PaymentMethod, PaymentStatus,
    ShippingAddress,
};

use crate::cart::pricing;
use crate::cart::{CartBackend, CartStore, Shopper};
use crate::db::OrderStore;
use crate::error::{AppError, Result};
use crate::services::catalog::ProductCatalog;
use crate::services::payment::{PaymentGateway, PaymentIntent};

/// Checkout coordinator over the order store and payment processor.
pub struct CheckoutOrchestrator<O, P> {
    orders: O,
    payments: P,
    pix_discount_percent: Option<Decimal>,
}

impl<O: OrderStore, P: PaymentGateway> CheckoutOrchestrator<O, P> {
    /// Create an orchestrator. `pix_discount_percent` enables the optional
    /// pix discount rule when set.
    pub const fn new(orders: O, payments: P, pix_discount_percent: Option<Decimal>) -> Self {
        Self {
            orders,
            payments,
            pix_discount_percent,
        }
    }

    /// Discount for the chosen payment method, computed against the subtotal.
    fn method_discount(&self, method: PaymentMethod, subtotal: Money) -> Money {
        match (method, self.pix_discount_percent) {
            (PaymentMethod::Pix, Some(percent)) => {
                (subtotal * (percent / Decimal::ONE_HUNDRED)).round_cents()
            }
            _ => Money::ZERO,
        }
    }

    /// Create an order from the current cart contents.
    ///
    /// Preconditions: the shopper is authenticated and the cart is
    /// non-empty. On success the order is persisted as `pending` /
    /// `awaiting_payment` and the cart is cleared. If persisting the order
    /// fails, the cart is left untouched so the shopper keeps their items; if
    /// clearing the cart fails after the order exists, the failure is logged
    /// and the order stands.
    ///
    /// # Errors
    ///
    /// - [`AppError::NotAuthenticated`] for guest shoppers; the caller sends
    ///   them through authentication instead of creating a guest order
    /// - [`AppError::Validation`] for an empty cart
    /// - [`AppError::Persistence`] if reading the cart or writing the order
    ///   fails
    #[tracing::instrument(skip_all, fields(owner = %cart.owner(), method = %payment_method))]
    pub async fn place_order<B: CartBackend, C: ProductCatalog>(
        &self,
        shopper: &Shopper,
        cart: &CartStore<B, C>,
        shipping_address: ShippingAddress,
        payment_method: PaymentMethod,
    ) -> Result<Order> {
        if !shopper.is_authenticated() {
            return Err(AppError::NotAuthenticated(
                "checkout requires a signed-in customer".to_owned(),
            ));
        }

        let items = cart.list().await?;
        if items.is_empty() {
            return Err(AppError::Validation("cart is empty".to_owned()));
        }

        let subtotal: Money = items.iter().map(LineItem::line_total).sum();
        let discount = self.method_discount(payment_method, subtotal);
        let quote = pricing::quote(&items, discount);

        let order = self
            .orders
            .create(NewOrder {
                owner_id: shopper.owner_id().clone(),
                items: items.into_iter().map(OrderItem::from).collect(),
                shipping_address,
                payment_method,
                subtotal: quote.subtotal,
                shipping: quote.shipping,
                discount: quote.discount,
                total: quote.total,
            })
            .await?;

        // Cart clearing is tied to order creation, not payment completion.
        // A clear failure here must not fail the checkout: the order exists.
        if let Err(e) = cart.clear().await {
            tracing::error!(
                order = %order.id,
                error = %e,
                "Order created but cart could not be cleared"
            );
        }

        tracing::info!(order = %order.id, total = %order.total, "Order placed");
        Ok(order)
    }

    /// Create the processor payment intent for a card order.
    ///
    /// Called after [`Self::place_order`] for methods that require capture.
    /// A failure here leaves the order `awaiting_payment` (and the cart
    /// already cleared); the shopper can retry the capture against the same
    /// order.
    ///
    /// # Errors
    ///
    /// - [`AppError::Validation`] if the order's method is settled out of
    ///   band and has no capture step
    /// - [`AppError::Payment`] if the processor call fails
    pub async fn start_capture(&self, order: &Order) -> Result<PaymentIntent> {
        if !order.payment_method.requires_capture() {
            return Err(AppError::Validation(format!(
                "payment method {} is settled out of band",
                order.payment_method
            )));
        }

        Ok(self.payments.create_intent(&order.id, order.total).await?)
    }

    /// Confirm a capture with the processor and mark the order paid.
    ///
    /// # Errors
    ///
    /// - [`AppError::Payment`] if the processor declines or the call fails;
    ///   the order stays `awaiting_payment`
    /// - [`AppError::Persistence`] if the status transition cannot be stored
    #[tracing::instrument(skip(self))]
    pub async fn confirm_payment(&self, order_id: &OrderId, reference: &str) -> Result<()> {
        self.payments.confirm(reference).await?;

        self.orders
            .update_payment_status(order_id, PaymentStatus::Paid, Some(reference))
            .await?;

        tracing::info!(order = %order_id, "Payment confirmed");
        Ok(())
    }
}
