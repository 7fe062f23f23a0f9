//! Static product catalog.
//!
//! The catalog is read once at startup (from JSON) and never mutated
//! afterwards. Lookups are linear scans; the catalog is small enough that an
//! index would only add bookkeeping.

use std::collections::BTreeSet;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{CategoryId, Price, ProductId};

/// Errors raised while loading a catalog document.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog JSON is invalid: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("duplicate product id: {0}")]
    DuplicateProduct(ProductId),
    #[error("duplicate category id: {0}")]
    DuplicateCategory(CategoryId),
    #[error("product {product} references unknown category {category}")]
    UnknownCategory {
        product: ProductId,
        category: CategoryId,
    },
    #[error("product {0} has a negative price")]
    NegativePrice(ProductId),
}

/// A product as listed in the shop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Unit price in USD.
    pub price: Decimal,
    pub category: CategoryId,
    pub image: String,
    #[serde(default)]
    pub sizes: Vec<String>,
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<Decimal>,
    /// Pre-discount price, shown struck through when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge: Option<String>,
}

impl Product {
    /// Unit price as a [`Price`].
    #[must_use]
    pub const fn unit_price(&self) -> Price {
        Price::usd(self.price)
    }

    /// Whether the product is marked down from an original price.
    #[must_use]
    pub fn is_discounted(&self) -> bool {
        self.original_price.is_some_and(|original| original > self.price)
    }

    /// Whole-percent discount off the original price, if any.
    #[must_use]
    pub fn discount_percent(&self) -> Option<u32> {
        let original = self.original_price.filter(|o| *o > self.price)?;
        ((original - self.price) / original * Decimal::ONE_HUNDRED)
            .round()
            .to_u32()
    }
}

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: String,
}

/// The full, immutable catalog.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    categories: Vec<Category>,
    products: Vec<Product>,
}

impl Catalog {
    /// Build a catalog, checking id uniqueness and category references.
    ///
    /// # Errors
    ///
    /// Returns a [`CatalogError`] for duplicate ids, products pointing at a
    /// category that does not exist, or negative prices.
    pub fn new(categories: Vec<Category>, products: Vec<Product>) -> Result<Self, CatalogError> {
        let mut seen_categories = BTreeSet::new();
        for category in &categories {
            if !seen_categories.insert(&category.id) {
                return Err(CatalogError::DuplicateCategory(category.id.clone()));
            }
        }

        let mut seen_products = BTreeSet::new();
        for product in &products {
            if !seen_products.insert(&product.id) {
                return Err(CatalogError::DuplicateProduct(product.id.clone()));
            }
            if !seen_categories.contains(&product.category) {
                return Err(CatalogError::UnknownCategory {
                    product: product.id.clone(),
                    category: product.category.clone(),
                });
            }
            if product.price.is_sign_negative() {
                return Err(CatalogError::NegativePrice(product.id.clone()));
            }
        }

        Ok(Self {
            categories,
            products,
        })
    }

    /// Parse and validate a catalog document of the form
    /// `{ "categories": [...], "products": [...] }`.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Parse`] for malformed JSON, or any validation
    /// error from [`Catalog::new`].
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let raw: Self = serde_json::from_str(json)?;
        Self::new(raw.categories, raw.products)
    }

    /// All products in catalog ("featured") order.
    #[must_use]
    pub fn products(&self) -> &[Product] {
        &self.products
    }

    /// All categories in catalog order.
    #[must_use]
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Look up a product by id.
    #[must_use]
    pub fn product(&self, id: &ProductId) -> Option<&Product> {
        self.products.iter().find(|p| &p.id == id)
    }

    /// Look up a category by id.
    #[must_use]
    pub fn category(&self, id: &CategoryId) -> Option<&Category> {
        self.categories.iter().find(|c| &c.id == id)
    }

    /// Products in a category, in catalog order.
    #[must_use]
    pub fn products_in_category(&self, id: &CategoryId) -> Vec<&Product> {
        self.products.iter().filter(|p| &p.category == id).collect()
    }

    /// Every size offered by any product, deduplicated and sorted.
    #[must_use]
    pub fn all_sizes(&self) -> Vec<String> {
        self.products
            .iter()
            .flat_map(|p| p.sizes.iter().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Every color offered by any product, deduplicated and sorted.
    #[must_use]
    pub fn all_colors(&self) -> Vec<String> {
        self.products
            .iter()
            .flat_map(|p| p.colors.iter().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;

    /// Build a minimal product for tests.
    pub(crate) fn product(id: &str, price: i64, category: &str) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("Product {id}"),
            description: String::new(),
            price: Decimal::from(price),
            category: CategoryId::new(category),
            image: "/placeholder.svg".to_string(),
            sizes: Vec::new(),
            colors: Vec::new(),
            rating: None,
            original_price: None,
            badge: None,
        }
    }

    pub(crate) fn category(id: &str) -> Category {
        Category {
            id: CategoryId::new(id),
            name: id.to_uppercase(),
            description: String::new(),
            image: String::new(),
        }
    }

    const SAMPLE: &str = r#"{
        "categories": [
            { "id": "shirts", "name": "Shirts" },
            { "id": "hoodies", "name": "Hoodies" }
        ],
        "products": [
            { "id": "1", "name": "Classic Tee", "price": "29.00", "category": "shirts",
              "image": "/tee.jpg", "sizes": ["M", "S", "L"], "colors": ["White", "Black"] },
            { "id": "2", "name": "Logo Hoodie", "price": 59, "category": "hoodies",
              "image": "/hoodie.jpg", "sizes": ["XL", "M"], "colors": ["Gray"],
              "originalPrice": "79.00", "badge": "Sale", "rating": "4.5" }
        ]
    }"#;

    #[test]
    fn test_from_json_parses_optional_fields() {
        let catalog = Catalog::from_json(SAMPLE).unwrap();
        assert_eq!(catalog.products().len(), 2);

        let hoodie = catalog.product(&ProductId::new("2")).unwrap();
        assert_eq!(hoodie.price, Decimal::from(59));
        assert_eq!(hoodie.badge.as_deref(), Some("Sale"));
        assert!(hoodie.is_discounted());
        assert_eq!(hoodie.discount_percent(), Some(25));

        let tee = catalog.product(&ProductId::new("1")).unwrap();
        assert!(!tee.is_discounted());
        assert_eq!(tee.discount_percent(), None);
        assert_eq!(tee.unit_price().display(), "$29.00");
    }

    #[test]
    fn test_facets_are_sorted_and_unique() {
        let catalog = Catalog::from_json(SAMPLE).unwrap();
        assert_eq!(catalog.all_sizes(), vec!["L", "M", "S", "XL"]);
        assert_eq!(catalog.all_colors(), vec!["Black", "Gray", "White"]);
    }

    #[test]
    fn test_products_in_category() {
        let catalog = Catalog::new(
            vec![category("a"), category("b")],
            vec![product("1", 20, "a"), product("2", 60, "b"), product("3", 120, "a")],
        )
        .unwrap();

        let ids: Vec<_> = catalog
            .products_in_category(&CategoryId::new("a"))
            .iter()
            .map(|p| p.id.as_str())
            .collect();
        assert_eq!(ids, vec!["1", "3"]);
        assert!(catalog.category(&CategoryId::new("zzz")).is_none());
    }

    #[test]
    fn test_rejects_duplicates_and_dangling_categories() {
        let dup = Catalog::new(vec![category("a")], vec![product("1", 1, "a"), product("1", 2, "a")]);
        assert!(matches!(dup, Err(CatalogError::DuplicateProduct(_))));

        let dangling = Catalog::new(vec![category("a")], vec![product("1", 1, "b")]);
        assert!(matches!(dangling, Err(CatalogError::UnknownCategory { .. })));

        let cats = Catalog::new(vec![category("a"), category("a")], Vec::new());
        assert!(matches!(cats, Err(CatalogError::DuplicateCategory(_))));
    }

    #[test]
    fn test_rejects_malformed_json() {
        assert!(matches!(
            Catalog::from_json("{ not json"),
            Err(CatalogError::Parse(_))
        ));
    }
}
