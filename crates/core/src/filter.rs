//! Shop listing filter and sort pipeline.
//!
//! All four filter dimensions (category, price bucket, size, color) are
//! combined with AND. Within price, size and color, multiple selections are
//! combined with OR. An empty selection passes everything.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::Product;
use crate::types::CategoryId;

/// Unrecognized filter or sort token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("unknown price range: {0}")]
    UnknownPriceRange(String),
    #[error("unknown sort order: {0}")]
    UnknownSortOrder(String),
}

// =============================================================================
// Price buckets
// =============================================================================

/// Fixed price buckets shown in the shop sidebar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PriceRange {
    #[serde(rename = "under-25")]
    Under25,
    #[serde(rename = "25-50")]
    From25To50,
    #[serde(rename = "50-100")]
    From50To100,
    #[serde(rename = "over-100")]
    Over100,
}

impl PriceRange {
    pub const ALL: [Self; 4] = [Self::Under25, Self::From25To50, Self::From50To100, Self::Over100];

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Under25 => "Under $25",
            Self::From25To50 => "$25 to $50",
            Self::From50To100 => "$50 to $100",
            Self::Over100 => "Over $100",
        }
    }

    /// Query-string token.
    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::Under25 => "under-25",
            Self::From25To50 => "25-50",
            Self::From50To100 => "50-100",
            Self::Over100 => "over-100",
        }
    }

    /// Inclusive lower bound and exclusive upper bound; `None` is unbounded.
    #[must_use]
    pub fn bounds(self) -> (Decimal, Option<Decimal>) {
        match self {
            Self::Under25 => (Decimal::ZERO, Some(Decimal::from(25))),
            Self::From25To50 => (Decimal::from(25), Some(Decimal::from(50))),
            Self::From50To100 => (Decimal::from(50), Some(Decimal::ONE_HUNDRED)),
            Self::Over100 => (Decimal::ONE_HUNDRED, None),
        }
    }

    #[must_use]
    pub fn contains(self, price: Decimal) -> bool {
        let (min, max) = self.bounds();
        price >= min && max.is_none_or(|max| price < max)
    }
}

impl fmt::Display for PriceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PriceRange {
    type Err = FilterError;

    /// Accepts either the slug or the display label.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|range| range.slug() == s || range.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| FilterError::UnknownPriceRange(s.to_string()))
    }
}

// =============================================================================
// Sort order
// =============================================================================

/// Listing order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortOrder {
    /// Catalog order.
    #[default]
    Featured,
    PriceLowHigh,
    PriceHighLow,
    /// Reverse catalog order; the catalog has no dates, so later entries are
    /// treated as newer.
    Newest,
}

impl SortOrder {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Featured => "featured",
            Self::PriceLowHigh => "price-low-high",
            Self::PriceHighLow => "price-high-low",
            Self::Newest => "newest",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | "featured" => Ok(Self::Featured),
            "price-low-high" => Ok(Self::PriceLowHigh),
            "price-high-low" => Ok(Self::PriceHighLow),
            "newest" => Ok(Self::Newest),
            other => Err(FilterError::UnknownSortOrder(other.to_string())),
        }
    }
}

// =============================================================================
// Filter state
// =============================================================================

/// Active shop selections.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShopFilter {
    pub category: Option<CategoryId>,
    pub price_ranges: Vec<PriceRange>,
    pub sizes: Vec<String>,
    pub colors: Vec<String>,
    pub sort: SortOrder,
}

fn toggle<T: PartialEq>(selected: &mut Vec<T>, value: T) {
    if let Some(pos) = selected.iter().position(|v| *v == value) {
        selected.remove(pos);
    } else {
        selected.push(value);
    }
}

impl ShopFilter {
    /// Select a category; reselecting the active one clears it.
    pub fn select_category(&mut self, category: CategoryId) {
        if self.category.as_ref() == Some(&category) {
            self.category = None;
        } else {
            self.category = Some(category);
        }
    }

    pub fn toggle_price_range(&mut self, range: PriceRange) {
        toggle(&mut self.price_ranges, range);
    }

    pub fn toggle_size(&mut self, size: impl Into<String>) {
        toggle(&mut self.sizes, size.into());
    }

    pub fn toggle_color(&mut self, color: impl Into<String>) {
        toggle(&mut self.colors, color.into());
    }

    /// Drop every filter and go back to featured order.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Whether any filter dimension is narrowing the listing.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.category.is_some()
            || !self.price_ranges.is_empty()
            || !self.sizes.is_empty()
            || !self.colors.is_empty()
    }

    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        let category_ok = self.category.as_ref().is_none_or(|c| &product.category == c);
        let price_ok = self.price_ranges.is_empty()
            || self.price_ranges.iter().any(|r| r.contains(product.price));
        let size_ok = self.sizes.is_empty() || product.sizes.iter().any(|s| self.sizes.contains(s));
        let color_ok =
            self.colors.is_empty() || product.colors.iter().any(|c| self.colors.contains(c));

        category_ok && price_ok && size_ok && color_ok
    }

    /// Filter and sort `products`. Sorting is stable for equal prices.
    #[must_use]
    pub fn apply<'a>(&self, products: &'a [Product]) -> Vec<&'a Product> {
        let mut out: Vec<&Product> = products.iter().filter(|p| self.matches(p)).collect();
        match self.sort {
            SortOrder::Featured => {}
            SortOrder::PriceLowHigh => out.sort_by(|a, b| a.price.cmp(&b.price)),
            SortOrder::PriceHighLow => out.sort_by(|a, b| b.price.cmp(&a.price)),
            SortOrder::Newest => out.reverse(),
        }
        out
    }
}
