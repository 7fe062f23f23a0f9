//! Simulated checkout route handlers.
//!
//! No payment is taken. Submission waits the configured delay to mimic
//! processing, stores the checkout details in the session, and points the
//! client at the success step, which completes the order.

use axum::{Json, extract::State};
use chrono::Utc;
use moodeng_core::OrderId;
use moodeng_core::cart::CartStore;
use moodeng_core::checkout::{
    self, CheckoutForm, CustomerDetails, OrderConfirmation, OrderTotals, ShippingAddress,
};
use moodeng_core::types::Price;
use rand::Rng;
use serde::Serialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{Result, add_breadcrumb};
use crate::models::SessionStorage;
use crate::state::AppState;

/// Where the client goes after a successful submission.
pub const SUCCESS_PATH: &str = "/checkout/success";

/// Totals shown when the shopper starts checking out.
#[derive(Debug, Serialize)]
pub struct CheckoutSummaryView {
    pub totals: OrderTotals,
    pub item_count: u32,
    pub display_total: String,
}

/// Response to a submitted checkout form.
#[derive(Debug, Serialize)]
pub struct CheckoutSubmittedView {
    pub next: &'static str,
    pub totals: OrderTotals,
    pub customer: CustomerDetails,
    pub shipping: ShippingAddress,
}

/// Order confirmation with a formatted total.
#[derive(Debug, Serialize)]
pub struct OrderConfirmationView {
    #[serde(flatten)]
    pub confirmation: OrderConfirmation,
    pub display_total_formatted: String,
}

/// `ORD-` followed by a random number below one million.
fn generate_order_id() -> OrderId {
    OrderId::new(format!("ORD-{}", rand::rng().random_range(0..1_000_000)))
}

/// Start checkout from the cart page.
#[instrument(skip(state, session))]
pub async fn begin(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<CheckoutSummaryView>> {
    let cart = CartStore::load(SessionStorage::load(&session).await?, state.sink());
    let totals = checkout::begin_checkout(&cart)?;

    Ok(Json(CheckoutSummaryView {
        totals,
        item_count: cart.item_count(),
        display_total: Price::usd(totals.total).display(),
    }))
}

/// Submit contact and shipping details.
#[instrument(skip(state, session, form))]
pub async fn submit(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<CheckoutForm>,
) -> Result<Json<CheckoutSubmittedView>> {
    let mut cart = CartStore::load(SessionStorage::load(&session).await?, state.sink());
    let details = checkout::submit_checkout(&mut cart, &form)?;

    let delay = state.config().checkout_delay;
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    cart.into_store().flush(&session).await?;
    add_breadcrumb("checkout", "Checkout submitted", None);

    Ok(Json(CheckoutSubmittedView {
        next: SUCCESS_PATH,
        totals: details.order.totals,
        customer: details.customer,
        shipping: details.shipping,
    }))
}

/// Success step: report the purchase and empty the cart.
#[instrument(skip(state, session))]
pub async fn complete(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<OrderConfirmationView>> {
    let mut cart = CartStore::load(SessionStorage::load(&session).await?, state.sink());
    let confirmation = checkout::complete_checkout(&mut cart, generate_order_id(), Utc::now())?;
    cart.into_store().flush(&session).await?;

    add_breadcrumb(
        "checkout",
        "Order completed",
        Some(&[("order_id", confirmation.order_id.as_str())]),
    );

    Ok(Json(OrderConfirmationView {
        display_total_formatted: Price::usd(confirmation.display_total).display(),
        confirmation,
    }))
}
