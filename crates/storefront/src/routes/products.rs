//! Catalog route handlers: categories, the filtered shop listing, product
//! detail, and recently viewed products.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use moodeng_core::analytics::{self, AnalyticsEvent};
use moodeng_core::catalog::{Category, Product};
use moodeng_core::filter::{PriceRange, ShopFilter, SortOrder};
use moodeng_core::recently_viewed::RecentlyViewed;
use moodeng_core::{CategoryId, ProductId};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::models::SessionStorage;
use crate::state::AppState;

// =============================================================================
// Views
// =============================================================================

/// Product as returned by the API, with display helpers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductView {
    #[serde(flatten)]
    pub product: Product,
    pub display_price: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_percent: Option<u32>,
}

impl From<&Product> for ProductView {
    fn from(product: &Product) -> Self {
        Self {
            product: product.clone(),
            display_price: product.unit_price().display(),
            discount_percent: product.discount_percent(),
        }
    }
}

/// Category with its products.
#[derive(Debug, Serialize)]
pub struct CategoryView {
    #[serde(flatten)]
    pub category: Category,
    pub products: Vec<ProductView>,
}

/// Filtered shop listing.
#[derive(Debug, Serialize)]
pub struct ProductListView {
    pub products: Vec<ProductView>,
    pub count: usize,
    pub sort: SortOrder,
    pub filtered: bool,
    pub facets: FacetsView,
}

/// Available filter values.
#[derive(Debug, Serialize)]
pub struct FacetsView {
    pub categories: Vec<Category>,
    pub price_ranges: Vec<PriceRangeView>,
    pub sizes: Vec<String>,
    pub colors: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct PriceRangeView {
    pub slug: &'static str,
    pub label: &'static str,
}

// =============================================================================
// Query Parsing
// =============================================================================

/// Shop listing query string.
///
/// `price`, `size` and `color` take comma-separated lists.
#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    pub category: Option<String>,
    pub price: Option<String>,
    pub size: Option<String>,
    pub color: Option<String>,
    pub sort: Option<String>,
}

fn split_list(value: Option<&str>) -> impl Iterator<Item = &str> {
    value
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

impl ProductQuery {
    /// Build the filter state this query selects.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for an unknown price range or sort.
    pub fn to_filter(&self) -> Result<ShopFilter> {
        let mut filter = ShopFilter::default();

        if let Some(category) = self.category.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            filter.select_category(CategoryId::new(category));
        }
        for slug in split_list(self.price.as_deref()) {
            let range: PriceRange = slug.parse()?;
            if !filter.price_ranges.contains(&range) {
                filter.toggle_price_range(range);
            }
        }
        for size in split_list(self.size.as_deref()) {
            if !filter.sizes.iter().any(|s| s == size) {
                filter.toggle_size(size);
            }
        }
        for color in split_list(self.color.as_deref()) {
            if !filter.colors.iter().any(|c| c == color) {
                filter.toggle_color(color);
            }
        }
        if let Some(sort) = &self.sort {
            filter.sort = sort.parse()?;
        }

        Ok(filter)
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// List all categories.
#[instrument(skip(state))]
pub async fn categories(State(state): State<AppState>) -> Json<Vec<Category>> {
    Json(state.catalog().categories().to_vec())
}

/// Show a category and its products.
#[instrument(skip(state))]
pub async fn category(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CategoryView>> {
    let id = CategoryId::new(id);
    let catalog = state.catalog();
    let category = catalog
        .category(&id)
        .ok_or_else(|| AppError::NotFound(format!("Category {id}")))?;

    Ok(Json(CategoryView {
        category: category.clone(),
        products: catalog
            .products_in_category(&id)
            .into_iter()
            .map(ProductView::from)
            .collect(),
    }))
}

/// Filtered, sorted shop listing.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<ProductListView>> {
    let filter = query.to_filter()?;
    let catalog = state.catalog();

    let products: Vec<ProductView> = filter
        .apply(catalog.products())
        .into_iter()
        .map(ProductView::from)
        .collect();

    tracing::debug!(count = products.len(), sort = %filter.sort, "Shop listing");

    Ok(Json(ProductListView {
        count: products.len(),
        products,
        sort: filter.sort,
        filtered: filter.is_active(),
        facets: FacetsView {
            categories: catalog.categories().to_vec(),
            price_ranges: PriceRange::ALL
                .into_iter()
                .map(|r| PriceRangeView {
                    slug: r.slug(),
                    label: r.label(),
                })
                .collect(),
            sizes: catalog.all_sizes(),
            colors: catalog.all_colors(),
        },
    }))
}

/// Product detail. Records the view and reports `ViewContent`.
#[instrument(skip(state, session))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
) -> Result<Json<ProductView>> {
    let id = ProductId::new(id);
    let product = state
        .catalog()
        .product(&id)
        .ok_or_else(|| AppError::NotFound(format!("Product {id}")))?;

    let mut recent = RecentlyViewed::load(SessionStorage::load(&session).await?);
    recent.record(&product.id);
    recent.into_store().flush(&session).await?;

    analytics::dispatch(state.sink().as_ref(), AnalyticsEvent::view_content(product));

    Ok(Json(ProductView::from(product)))
}

/// Products this visitor looked at recently, most recent first.
#[instrument(skip(state, session))]
pub async fn recently_viewed(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<Vec<ProductView>>> {
    let recent = RecentlyViewed::load(SessionStorage::load(&session).await?);
    Ok(Json(
        recent
            .products(state.catalog())
            .into_iter()
            .map(ProductView::from)
            .collect(),
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_query_to_filter() {
        let query = ProductQuery {
            category: Some("shirts".to_string()),
            price: Some("under-25, 50-100,".to_string()),
            size: Some("M,L,M".to_string()),
            color: None,
            sort: Some("price-high-low".to_string()),
        };
        let filter = query.to_filter().unwrap();

        assert_eq!(filter.category, Some(CategoryId::new("shirts")));
        assert_eq!(
            filter.price_ranges,
            vec![PriceRange::Under25, PriceRange::From50To100]
        );
        assert_eq!(filter.sizes, vec!["M", "L"]);
        assert!(filter.colors.is_empty());
        assert_eq!(filter.sort, SortOrder::PriceHighLow);
    }

    #[test]
    fn test_query_rejects_unknown_tokens() {
        let query = ProductQuery {
            sort: Some("cheapest".to_string()),
            ..ProductQuery::default()
        };
        assert!(matches!(query.to_filter(), Err(AppError::BadRequest(_))));

        let query = ProductQuery {
            price: Some("free".to_string()),
            ..ProductQuery::default()
        };
        assert!(matches!(query.to_filter(), Err(AppError::BadRequest(_))));
    }
}
