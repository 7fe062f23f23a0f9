//! Catalog browsing commands.
//!
//! Output is plain tab-separated text so it can be piped into `column -t`
//! or `cut`.

use std::io::Write;

use moodeng_core::catalog::Catalog;
use moodeng_core::filter::{PriceRange, ShopFilter};
use moodeng_core::{CategoryId, ProductId};

use super::CliError;

/// Build a shop filter from command-line selections.
///
/// # Errors
///
/// Returns `CliError::Filter` for an unknown price slug or sort order.
pub fn build_filter(
    category: Option<String>,
    prices: &[String],
    sizes: Vec<String>,
    colors: Vec<String>,
    sort: &str,
) -> Result<ShopFilter, CliError> {
    let mut price_ranges: Vec<PriceRange> = Vec::with_capacity(prices.len());
    for price in prices {
        let range = price.parse()?;
        if !price_ranges.contains(&range) {
            price_ranges.push(range);
        }
    }

    Ok(ShopFilter {
        category: category.map(CategoryId::new),
        price_ranges,
        sizes,
        colors,
        sort: sort.parse()?,
    })
}

/// `id  name  product-count`
///
/// # Errors
///
/// Returns `CliError::Io` if writing fails.
pub fn categories(catalog: &Catalog, out: &mut impl Write) -> Result<(), CliError> {
    for category in catalog.categories() {
        let count = catalog.products_in_category(&category.id).len();
        writeln!(out, "{}\t{}\t{count}", category.id, category.name)?;
    }
    Ok(())
}

/// `id  name  price` for every product passing the filter.
///
/// # Errors
///
/// Returns `CliError::Io` if writing fails.
pub fn products(catalog: &Catalog, filter: &ShopFilter, out: &mut impl Write) -> Result<(), CliError> {
    let products = filter.apply(catalog.products());
    for product in &products {
        writeln!(
            out,
            "{}\t{}\t{}",
            product.id,
            product.name,
            product.unit_price().display()
        )?;
    }
    tracing::info!(count = products.len(), "Listed products");
    Ok(())
}

/// Full details of one product.
///
/// # Errors
///
/// Returns `CliError::ProductNotFound` for an unknown ID.
pub fn show(catalog: &Catalog, id: &str, out: &mut impl Write) -> Result<(), CliError> {
    let product = catalog
        .product(&ProductId::new(id))
        .ok_or_else(|| CliError::ProductNotFound(id.to_string()))?;

    writeln!(out, "{} ({})", product.name, product.id)?;
    writeln!(out, "Category:\t{}", product.category)?;
    match (product.original_price, product.discount_percent()) {
        (Some(original), Some(percent)) => writeln!(
            out,
            "Price:\t{} (was ${original:.2}, {percent}% off)",
            product.unit_price().display()
        )?,
        _ => writeln!(out, "Price:\t{}", product.unit_price().display())?,
    }
    if !product.sizes.is_empty() {
        writeln!(out, "Sizes:\t{}", product.sizes.join(", "))?;
    }
    if !product.colors.is_empty() {
        writeln!(out, "Colors:\t{}", product.colors.join(", "))?;
    }
    if let Some(rating) = product.rating {
        writeln!(out, "Rating:\t{rating}")?;
    }
    if let Some(badge) = &product.badge {
        writeln!(out, "Badge:\t{badge}")?;
    }
    if !product.description.is_empty() {
        writeln!(out, "\n{}", product.description)?;
    }
    Ok(())
}

/// Sizes, colors and price ranges available for filtering.
///
/// # Errors
///
/// Returns `CliError::Io` if writing fails.
pub fn facets(catalog: &Catalog, out: &mut impl Write) -> Result<(), CliError> {
    writeln!(out, "Sizes:\t{}", catalog.all_sizes().join(", "))?;
    writeln!(out, "Colors:\t{}", catalog.all_colors().join(", "))?;
    writeln!(out, "Price ranges:")?;
    for range in PriceRange::ALL {
        writeln!(out, "  {}\t{}", range.slug(), range.label())?;
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use moodeng_core::filter::SortOrder;
    use moodeng_storefront::catalog::load_catalog;

    use super::*;

    fn render(f: impl FnOnce(&mut Vec<u8>) -> Result<(), CliError>) -> String {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_build_filter_dedupes_prices() {
        let filter = build_filter(
            Some("shirts".to_string()),
            &["under-25".to_string(), "under-25".to_string()],
            vec!["M".to_string()],
            Vec::new(),
            "newest",
        )
        .unwrap();
        assert_eq!(filter.price_ranges, vec![PriceRange::Under25]);
        assert_eq!(filter.sort, SortOrder::Newest);

        assert!(matches!(
            build_filter(None, &[], Vec::new(), Vec::new(), "cheapest"),
            Err(CliError::Filter(_))
        ));
    }

    #[test]
    fn test_products_lists_filtered_rows() {
        let catalog = load_catalog(None).unwrap();
        let filter = build_filter(
            Some("hoodies".to_string()),
            &[],
            Vec::new(),
            Vec::new(),
            "price-low-high",
        )
        .unwrap();

        let output = render(|out| products(&catalog, &filter, out));
        let ids: Vec<&str> = output
            .lines()
            .filter_map(|line| line.split('\t').next())
            .collect();
        assert_eq!(ids, vec!["2", "6", "7"]);
    }

    #[test]
    fn test_show_and_missing_product() {
        let catalog = load_catalog(None).unwrap();
        let output = render(|out| show(&catalog, "2", out));
        assert!(output.starts_with("Logo Hoodie (2)"));
        assert!(output.contains("25% off"));

        let mut buf = Vec::new();
        assert!(matches!(
            show(&catalog, "404", &mut buf),
            Err(CliError::ProductNotFound(_))
        ));
    }

    #[test]
    fn test_categories_and_facets() {
        let catalog = load_catalog(None).unwrap();
        let output = render(|out| categories(&catalog, out));
        assert!(output.lines().any(|l| l == "shirts\tShirts\t3"));

        let output = render(|out| facets(&catalog, out));
        assert!(output.contains("under-25\tUnder $25"));
    }
}
