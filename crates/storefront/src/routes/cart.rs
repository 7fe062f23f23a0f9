//! Cart route handlers.
//!
//! Every mutation loads the visitor's cart from the session, applies one
//! operation, flushes the session, and returns the updated cart.

use axum::{Json, extract::State};
use moodeng_core::ProductId;
use moodeng_core::cart::{CartItem, CartStore};
use moodeng_core::catalog::Product;
use moodeng_core::checkout::FREE_SHIPPING_THRESHOLD;
use moodeng_core::types::Price;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{AppError, Result, add_breadcrumb};
use crate::models::SessionStorage;
use crate::routes::products::ProductView;
use crate::state::AppState;

// =============================================================================
// Views
// =============================================================================

/// One cart line for display.
#[derive(Debug, Serialize)]
pub struct CartLineView {
    pub product: ProductView,
    pub quantity: u32,
    pub size: Option<String>,
    pub color: Option<String>,
    pub line_total: Decimal,
    pub display_line_total: String,
}

impl From<&CartItem> for CartLineView {
    fn from(line: &CartItem) -> Self {
        Self {
            product: ProductView::from(&line.product),
            quantity: line.quantity,
            size: line.size.clone(),
            color: line.color.clone(),
            line_total: line.line_total(),
            display_line_total: Price::usd(line.line_total()).display(),
        }
    }
}

/// Cart page data: lines plus the pre-tax estimate.
#[derive(Debug, Serialize)]
pub struct CartView {
    pub items: Vec<CartLineView>,
    pub item_count: u32,
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub estimated_total: Decimal,
    pub free_shipping: bool,
    /// How much more to spend for free shipping, when not yet reached.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub free_shipping_remaining: Option<Decimal>,
    pub display_subtotal: String,
    pub display_estimated_total: String,
}

impl CartView {
    /// Build the view for a cart.
    #[must_use]
    pub fn from_cart<S: moodeng_core::storage::KeyValueStore>(cart: &CartStore<S>) -> Self {
        let totals = cart.totals();
        let free_shipping = totals.ships_free();
        Self {
            items: cart.items().iter().map(CartLineView::from).collect(),
            item_count: cart.item_count(),
            subtotal: totals.subtotal,
            shipping: totals.shipping,
            estimated_total: totals.estimated_total(),
            free_shipping,
            free_shipping_remaining: (!free_shipping && !cart.is_empty())
                .then(|| FREE_SHIPPING_THRESHOLD - totals.subtotal),
            display_subtotal: Price::usd(totals.subtotal).display(),
            display_estimated_total: Price::usd(totals.estimated_total()).display(),
        }
    }
}

// =============================================================================
// Request Bodies
// =============================================================================

/// Add to cart request.
#[derive(Debug, Deserialize)]
pub struct AddToCartRequest {
    pub product_id: ProductId,
    pub quantity: Option<u32>,
    pub size: Option<String>,
    pub color: Option<String>,
}

/// Update quantity request.
///
/// Without `size` and `color`, every line of the product is updated.
#[derive(Debug, Deserialize)]
pub struct UpdateCartRequest {
    pub product_id: ProductId,
    pub quantity: i64,
    pub size: Option<String>,
    pub color: Option<String>,
}

/// Remove request.
///
/// Without `size` and `color`, every line of the product is removed.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartRequest {
    pub product_id: ProductId,
    pub size: Option<String>,
    pub color: Option<String>,
}

impl UpdateCartRequest {
    const fn targets_line(&self) -> bool {
        self.size.is_some() || self.color.is_some()
    }
}

impl RemoveFromCartRequest {
    const fn targets_line(&self) -> bool {
        self.size.is_some() || self.color.is_some()
    }
}

// =============================================================================
// Helpers
// =============================================================================

async fn load_cart(state: &AppState, session: &Session) -> Result<CartStore<SessionStorage>> {
    let storage = SessionStorage::load(session).await?;
    Ok(CartStore::load(storage, state.sink()))
}

/// Flush the cart and render it.
async fn save_cart(cart: CartStore<SessionStorage>, session: &Session) -> Result<Json<CartView>> {
    let view = CartView::from_cart(&cart);
    cart.into_store().flush(session).await?;
    Ok(Json(view))
}

fn find_product<'a>(state: &'a AppState, id: &ProductId) -> Result<&'a Product> {
    state
        .catalog()
        .product(id)
        .ok_or_else(|| AppError::NotFound(format!("Product {id}")))
}

/// Reject a size or color the product is not offered in.
fn check_option(kind: &str, value: Option<&str>, offered: &[String]) -> Result<()> {
    match value {
        Some(v) if !offered.iter().any(|o| o == v) => Err(AppError::BadRequest(format!(
            "{kind} {v} is not available for this product"
        ))),
        _ => Ok(()),
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Show the cart.
#[instrument(skip(state, session))]
pub async fn show(State(state): State<AppState>, session: Session) -> Result<Json<CartView>> {
    let cart = load_cart(&state, &session).await?;
    Ok(Json(CartView::from_cart(&cart)))
}

/// Cart badge count.
#[instrument(skip(state, session))]
pub async fn count(State(state): State<AppState>, session: Session) -> Result<Json<Value>> {
    let cart = load_cart(&state, &session).await?;
    Ok(Json(json!({ "count": cart.item_count() })))
}

/// Add a product variant to the cart.
#[instrument(skip(state, session))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<AddToCartRequest>,
) -> Result<Json<CartView>> {
    let product = find_product(&state, &request.product_id)?;
    check_option("Size", request.size.as_deref(), &product.sizes)?;
    check_option("Color", request.color.as_deref(), &product.colors)?;

    let quantity = request.quantity.unwrap_or(1);
    if quantity == 0 {
        return Err(AppError::BadRequest("Quantity must be at least 1".to_string()));
    }

    let mut cart = load_cart(&state, &session).await?;
    cart.add_item(
        product,
        quantity,
        request.size.as_deref(),
        request.color.as_deref(),
    );
    add_breadcrumb("cart", "Added to cart", Some(&[("product_id", product.id.as_str())]));

    save_cart(cart, &session).await
}

/// Set a line's quantity. Quantities below 1 leave the cart unchanged.
#[instrument(skip(state, session))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<UpdateCartRequest>,
) -> Result<Json<CartView>> {
    find_product(&state, &request.product_id)?;

    let mut cart = load_cart(&state, &session).await?;
    if request.targets_line() {
        cart.update_line_quantity(
            &request.product_id,
            request.size.as_deref(),
            request.color.as_deref(),
            request.quantity,
        );
    } else {
        cart.update_quantity(&request.product_id, request.quantity);
    }

    save_cart(cart, &session).await
}

/// Remove a product, or one of its lines.
#[instrument(skip(state, session))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<RemoveFromCartRequest>,
) -> Result<Json<CartView>> {
    find_product(&state, &request.product_id)?;

    let mut cart = load_cart(&state, &session).await?;
    let removed = if request.targets_line() {
        usize::from(cart.remove_line(
            &request.product_id,
            request.size.as_deref(),
            request.color.as_deref(),
        ))
    } else {
        cart.remove_item(&request.product_id)
    };
    tracing::debug!(product_id = %request.product_id, removed, "Removed from cart");
    add_breadcrumb(
        "cart",
        "Removed from cart",
        Some(&[("product_id", request.product_id.as_str())]),
    );

    save_cart(cart, &session).await
}

/// Empty the cart.
#[instrument(skip(state, session))]
pub async fn clear(State(state): State<AppState>, session: Session) -> Result<Json<CartView>> {
    let mut cart = load_cart(&state, &session).await?;
    cart.clear_cart();
    save_cart(cart, &session).await
}
