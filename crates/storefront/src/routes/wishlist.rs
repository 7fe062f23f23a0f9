//! Wishlist route handlers.

use axum::{Json, extract::State};
use moodeng_core::ProductId;
use moodeng_core::wishlist::WishlistStore;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::models::SessionStorage;
use crate::routes::products::ProductView;
use crate::state::AppState;

/// Saved products.
#[derive(Debug, Serialize)]
pub struct WishlistView {
    pub items: Vec<ProductView>,
    pub count: usize,
}

impl WishlistView {
    fn from_wishlist(wishlist: &WishlistStore<SessionStorage>) -> Self {
        Self {
            items: wishlist.items().iter().map(ProductView::from).collect(),
            count: wishlist.item_count(),
        }
    }
}

/// Request naming one product.
#[derive(Debug, Deserialize)]
pub struct WishlistRequest {
    pub product_id: ProductId,
}

async fn load_wishlist(session: &Session) -> Result<WishlistStore<SessionStorage>> {
    Ok(WishlistStore::load(SessionStorage::load(session).await?))
}

async fn save_wishlist(
    wishlist: WishlistStore<SessionStorage>,
    session: &Session,
) -> Result<Json<WishlistView>> {
    let view = WishlistView::from_wishlist(&wishlist);
    wishlist.into_store().flush(session).await?;
    Ok(Json(view))
}

/// Show the wishlist.
#[instrument(skip(session))]
pub async fn show(session: Session) -> Result<Json<WishlistView>> {
    let wishlist = load_wishlist(&session).await?;
    Ok(Json(WishlistView::from_wishlist(&wishlist)))
}

/// Save a product.
#[instrument(skip(state, session))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<WishlistRequest>,
) -> Result<Json<WishlistView>> {
    let product = state
        .catalog()
        .product(&request.product_id)
        .ok_or_else(|| AppError::NotFound(format!("Product {}", request.product_id)))?;

    let mut wishlist = load_wishlist(&session).await?;
    wishlist.add_item(product);
    save_wishlist(wishlist, &session).await
}

/// Remove a saved product. Removing one that is not saved is not an error.
#[instrument(skip(session))]
pub async fn remove(
    session: Session,
    Json(request): Json<WishlistRequest>,
) -> Result<Json<WishlistView>> {
    let mut wishlist = load_wishlist(&session).await?;
    wishlist.remove_item(&request.product_id);
    save_wishlist(wishlist, &session).await
}

/// Flip a product in or out of the wishlist.
#[instrument(skip(state, session))]
pub async fn toggle(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<WishlistRequest>,
) -> Result<Json<Value>> {
    let product = state
        .catalog()
        .product(&request.product_id)
        .ok_or_else(|| AppError::NotFound(format!("Product {}", request.product_id)))?;

    let mut wishlist = load_wishlist(&session).await?;
    let in_wishlist = wishlist.toggle(product);
    let count = wishlist.item_count();
    wishlist.into_store().flush(&session).await?;

    Ok(Json(json!({ "in_wishlist": in_wishlist, "count": count })))
}

/// Empty the wishlist.
#[instrument(skip(session))]
pub async fn clear(session: Session) -> Result<Json<WishlistView>> {
    let mut wishlist = load_wishlist(&session).await?;
    wishlist.clear_wishlist();
    save_wishlist(wishlist, &session).await
}
