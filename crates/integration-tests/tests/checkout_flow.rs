//! Checkout scenarios, including the full guest-to-order journey.

use std::sync::Arc;

use rust_decimal::Decimal;

use mangaba_core::{
    Money, OrderStatus, OwnerId, PaymentMethod, PaymentStatus, ProductId, ShippingAddress, Variant,
};
use mangaba_integration_tests::{FakeCatalog, FakePaymentGateway, InMemoryCartBackend, InMemoryOrderStore};
use mangaba_storefront::cart::{
    CartStore, GuestCartBackend, InMemoryCartStorage, Shopper, merge,
};
use mangaba_storefront::checkout::CheckoutOrchestrator;
use mangaba_storefront::error::AppError;

fn catalog() -> FakeCatalog {
    FakeCatalog::default()
        .with_product("shirt-1", "Linen Shirt", 5_000)
        .with_product("shoe-2", "Trail Shoe", 12_000)
}

fn address() -> ShippingAddress {
    ShippingAddress {
        recipient: "Ana Souza".to_owned(),
        street: "Rua das Mangabeiras".to_owned(),
        number: "128".to_owned(),
        complement: Some("ap 42".to_owned()),
        district: "Centro".to_owned(),
        city: "Recife".to_owned(),
        state: "PE".to_owned(),
        postal_code: "50030-230".to_owned(),
    }
}

fn customer_cart() -> CartStore<InMemoryCartBackend, FakeCatalog> {
    CartStore::new(
        InMemoryCartBackend::default(),
        catalog(),
        OwnerId::new("customer-7"),
    )
}

fn orchestrator(
    orders: &InMemoryOrderStore,
    payments: &FakePaymentGateway,
) -> CheckoutOrchestrator<InMemoryOrderStore, FakePaymentGateway> {
    CheckoutOrchestrator::new(orders.clone(), payments.clone(), None)
}

#[tokio::test]
async fn guest_journey_from_first_add_to_placed_pix_order() {
    // A guest fills their cart: shirt (50.00) x2 and shoes (120.00) x1.
    let storage = Arc::new(InMemoryCartStorage::default());
    let guest_owner = OwnerId::new("guest-42");
    let guest_cart = CartStore::new(
        GuestCartBackend::new(storage.clone()),
        catalog(),
        guest_owner.clone(),
    );
    guest_cart
        .add_item(&ProductId::new("shirt-1"), 2, Variant::none())
        .await
        .expect("guest adds shirt");
    guest_cart
        .add_item(&ProductId::new("shoe-2"), 1, Variant::none())
        .await
        .expect("guest adds shoes");

    // Subtotal 220.00 clears the free-shipping threshold.
    let pricing = guest_cart.pricing().await.expect("pricing");
    assert_eq!(pricing.subtotal, Money::from_cents(22_000));
    assert_eq!(pricing.shipping, Money::ZERO);
    assert_eq!(pricing.total, Money::from_cents(22_000));

    // The shopper signs in; the guest cart merges into their remote cart.
    let shopper = Shopper::Customer(OwnerId::new("customer-7"));
    let authenticated = customer_cart();
    let report = merge(&GuestCartBackend::new(storage), &guest_owner, &authenticated)
        .await
        .expect("merge");
    assert!(report.is_complete());

    // Checkout with pix.
    let orders = InMemoryOrderStore::default();
    let payments = FakePaymentGateway::default();
    let order = orchestrator(&orders, &payments)
        .place_order(&shopper, &authenticated, address(), PaymentMethod::Pix)
        .await
        .expect("place order");

    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.payment_status, PaymentStatus::AwaitingPayment);
    assert_eq!(order.total, Money::from_cents(22_000));
    assert_eq!(order.items.len(), 2);

    // The cart is cleared once the order exists.
    assert!(authenticated.list().await.expect("list").is_empty());

    // Pix is settled out of band: no processor intent was created.
    assert!(payments.intents().is_empty());
}

#[tokio::test]
async fn checkout_rejects_guests() {
    let cart = customer_cart();
    cart.add_item(&ProductId::new("shirt-1"), 1, Variant::none())
        .await
        .expect("add");

    let orders = InMemoryOrderStore::default();
    let payments = FakePaymentGateway::default();
    let result = orchestrator(&orders, &payments)
        .place_order(
            &Shopper::Guest(OwnerId::new("guest-42")),
            &cart,
            address(),
            PaymentMethod::Pix,
        )
        .await;

    assert!(matches!(result, Err(AppError::NotAuthenticated(_))));
    assert!(orders.orders().is_empty());
    // The cart survives the rejected attempt.
    assert_eq!(cart.list().await.expect("list").len(), 1);
}

#[tokio::test]
async fn checkout_rejects_an_empty_cart() {
    let cart = customer_cart();
    let orders = InMemoryOrderStore::default();
    let payments = FakePaymentGateway::default();

    let result = orchestrator(&orders, &payments)
        .place_order(
            &Shopper::Customer(OwnerId::new("customer-7")),
            &cart,
            address(),
            PaymentMethod::Card,
        )
        .await;

    assert!(matches!(result, Err(AppError::Validation(_))));
    assert!(orders.orders().is_empty());
}

#[tokio::test]
async fn order_persistence_failure_leaves_the_cart_intact() {
    let cart = customer_cart();
    cart.add_item(&ProductId::new("shirt-1"), 2, Variant::none())
        .await
        .expect("add");

    let orders = InMemoryOrderStore::default();
    orders.fail_next_create();
    let payments = FakePaymentGateway::default();

    let result = orchestrator(&orders, &payments)
        .place_order(
            &Shopper::Customer(OwnerId::new("customer-7")),
            &cart,
            address(),
            PaymentMethod::Pix,
        )
        .await;

    assert!(matches!(result, Err(AppError::Persistence(_))));
    assert!(orders.orders().is_empty());
    assert_eq!(
        cart.list().await.expect("list").len(),
        1,
        "the shopper must not lose their items when the order was not created"
    );
}

#[tokio::test]
async fn card_orders_capture_then_confirm() {
    let cart = customer_cart();
    cart.add_item(&ProductId::new("shoe-2"), 1, Variant::none())
        .await
        .expect("add");

    let orders = InMemoryOrderStore::default();
    let payments = FakePaymentGateway::default();
    let checkout = orchestrator(&orders, &payments);
    let shopper = Shopper::Customer(OwnerId::new("customer-7"));

    let order = checkout
        .place_order(&shopper, &cart, address(), PaymentMethod::Card)
        .await
        .expect("place order");
    assert_eq!(order.payment_status, PaymentStatus::AwaitingPayment);

    let intent = checkout.start_capture(&order).await.expect("intent");
    checkout
        .confirm_payment(&order.id, &intent.reference)
        .await
        .expect("confirm");

    let stored = orders
        .get_order(&order.id)
        .expect("order exists");
    assert_eq!(stored.payment_status, PaymentStatus::Paid);
    assert_eq!(stored.payment_reference.as_deref(), Some(intent.reference.as_str()));
}

#[tokio::test]
async fn capture_failure_leaves_order_awaiting_and_cart_cleared() {
    let cart = customer_cart();
    cart.add_item(&ProductId::new("shoe-2"), 1, Variant::none())
        .await
        .expect("add");

    let orders = InMemoryOrderStore::default();
    let payments = FakePaymentGateway::default();
    payments.fail_next_intent();
    let checkout = orchestrator(&orders, &payments);
    let shopper = Shopper::Customer(OwnerId::new("customer-7"));

    let order = checkout
        .place_order(&shopper, &cart, address(), PaymentMethod::Card)
        .await
        .expect("place order");

    let result = checkout.start_capture(&order).await;
    assert!(matches!(result, Err(AppError::Payment(_))));

    // Accepted asymmetry: the order exists and stays awaiting payment, and
    // the cart was already cleared at order creation.
    let stored = orders.get_order(&order.id).expect("order exists");
    assert_eq!(stored.payment_status, PaymentStatus::AwaitingPayment);
    assert!(cart.list().await.expect("list").is_empty());
}

#[tokio::test]
async fn declined_confirmation_keeps_order_awaiting() {
    let cart = customer_cart();
    cart.add_item(&ProductId::new("shoe-2"), 1, Variant::none())
        .await
        .expect("add");

    let orders = InMemoryOrderStore::default();
    let payments = FakePaymentGateway::default();
    payments.decline_confirmations();
    let checkout = orchestrator(&orders, &payments);
    let shopper = Shopper::Customer(OwnerId::new("customer-7"));

    let order = checkout
        .place_order(&shopper, &cart, address(), PaymentMethod::Card)
        .await
        .expect("place order");
    let intent = checkout.start_capture(&order).await.expect("intent");

    let result = checkout.confirm_payment(&order.id, &intent.reference).await;
    assert!(matches!(result, Err(AppError::Payment(_))));

    let stored = orders.get_order(&order.id).expect("order exists");
    assert_eq!(stored.payment_status, PaymentStatus::AwaitingPayment);
}

#[tokio::test]
async fn starting_capture_for_out_of_band_methods_is_rejected() {
    let cart = customer_cart();
    cart.add_item(&ProductId::new("shirt-1"), 1, Variant::none())
        .await
        .expect("add");

    let orders = InMemoryOrderStore::default();
    let payments = FakePaymentGateway::default();
    let checkout = orchestrator(&orders, &payments);

    let order = checkout
        .place_order(
            &Shopper::Customer(OwnerId::new("customer-7")),
            &cart,
            address(),
            PaymentMethod::Boleto,
        )
        .await
        .expect("place order");

    let result = checkout.start_capture(&order).await;
    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn pix_discount_rule_reduces_the_total_when_enabled() {
    let cart = customer_cart();
    cart.add_item(&ProductId::new("shirt-1"), 2, Variant::none())
        .await
        .expect("add shirt");
    cart.add_item(&ProductId::new("shoe-2"), 1, Variant::none())
        .await
        .expect("add shoes");

    let orders = InMemoryOrderStore::default();
    let payments = FakePaymentGateway::default();
    // 5% pix discount enabled.
    let checkout = CheckoutOrchestrator::new(orders.clone(), payments, Some(Decimal::from(5)));

    let order = checkout
        .place_order(
            &Shopper::Customer(OwnerId::new("customer-7")),
            &cart,
            address(),
            PaymentMethod::Pix,
        )
        .await
        .expect("place order");

    // 220.00 subtotal, free shipping, 5% = 11.00 off.
    assert_eq!(order.subtotal, Money::from_cents(22_000));
    assert_eq!(order.discount, Money::from_cents(1_100));
    assert_eq!(order.total, Money::from_cents(20_900));
}

#[tokio::test]
async fn orders_are_listed_newest_first_per_owner() {
    let cart = customer_cart();
    let orders = InMemoryOrderStore::default();
    let payments = FakePaymentGateway::default();
    let checkout = orchestrator(&orders, &payments);
    let shopper = Shopper::Customer(OwnerId::new("customer-7"));

    for _ in 0..2 {
        cart.add_item(&ProductId::new("shirt-1"), 1, Variant::none())
            .await
            .expect("add");
        checkout
            .place_order(&shopper, &cart, address(), PaymentMethod::Pix)
            .await
            .expect("place order");
    }

    use mangaba_storefront::db::OrderStore;
    let history = orders
        .list_for_owner(&OwnerId::new("customer-7"))
        .await
        .expect("history");
    assert_eq!(history.len(), 2);
    assert!(history.first().map(|o| o.created_at) >= history.last().map(|o| o.created_at));
}
