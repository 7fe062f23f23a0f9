//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                   - Health check
//!
//! # Catalog
//! GET  /api/categories           - Category listing
//! GET  /api/categories/{id}      - Category with its products
//! GET  /api/products             - Shop listing (category, price, size, color, sort)
//! GET  /api/products/{id}        - Product detail (records recently viewed)
//! GET  /api/recently-viewed      - Recently viewed products
//!
//! # Cart
//! GET  /api/cart                 - Cart with pre-tax estimate
//! GET  /api/cart/count           - Cart badge count
//! POST /api/cart/add             - Add a product variant
//! POST /api/cart/update          - Set quantity (below 1 is ignored)
//! POST /api/cart/remove          - Remove a product or one line
//! POST /api/cart/clear           - Empty the cart
//!
//! # Wishlist
//! GET  /api/wishlist             - Saved products
//! POST /api/wishlist/add         - Save a product
//! POST /api/wishlist/remove      - Unsave a product
//! POST /api/wishlist/toggle      - Flip a product
//! POST /api/wishlist/clear       - Empty the wishlist
//!
//! # Checkout
//! POST /api/checkout/begin       - Start checkout, returns totals
//! POST /api/checkout             - Submit details (simulated processing delay)
//! POST /api/checkout/complete    - Complete the order, empties the cart
//! ```

pub mod cart;
pub mod checkout;
pub mod products;
pub mod wishlist;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the catalog routes router.
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/categories", get(products::categories))
        .route("/categories/{id}", get(products::category))
        .route("/products", get(products::index))
        .route("/products/{id}", get(products::show))
        .route("/recently-viewed", get(products::recently_viewed))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/count", get(cart::count))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/clear", post(cart::clear))
}

/// Create the wishlist routes router.
pub fn wishlist_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(wishlist::show))
        .route("/add", post(wishlist::add))
        .route("/remove", post(wishlist::remove))
        .route("/toggle", post(wishlist::toggle))
        .route("/clear", post(wishlist::clear))
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(checkout::submit))
        .route("/begin", post(checkout::begin))
        .route("/complete", post(checkout::complete))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    let api = Router::new()
        .merge(catalog_routes())
        .nest("/cart", cart_routes())
        .nest("/wishlist", wishlist_routes())
        .nest("/checkout", checkout_routes());

    Router::new().nest("/api", api)
}
