//! CLI command implementations.

pub mod catalog;

use moodeng_core::filter::FilterError;
use moodeng_storefront::catalog::CatalogLoadError;
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Catalog could not be loaded.
    #[error(transparent)]
    Catalog(#[from] CatalogLoadError),

    /// Unknown price range or sort order.
    #[error(transparent)]
    Filter(#[from] FilterError),

    /// No product with this ID.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Writing output failed.
    #[error("Output error: {0}")]
    Io(#[from] std::io::Error),
}
