//! Catalog loading.
//!
//! The storefront ships with an embedded catalog so it runs with no
//! configuration. `STOREFRONT_CATALOG_PATH` points at a replacement document
//! with the same shape.

use std::path::{Path, PathBuf};

use moodeng_core::catalog::{Catalog, CatalogError};
use thiserror::Error;

/// Catalog bundled into the binary.
pub const EMBEDDED_CATALOG: &str = include_str!("../content/catalog.json");

/// Errors raised while loading the catalog at startup.
#[derive(Debug, Error)]
pub enum CatalogLoadError {
    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Invalid(#[from] CatalogError),
}

/// Load the catalog from `path`, or the embedded catalog when `None`.
///
/// # Errors
///
/// Returns `CatalogLoadError` if the file cannot be read or fails
/// validation.
pub fn load_catalog(path: Option<&Path>) -> Result<Catalog, CatalogLoadError> {
    let catalog = match path {
        Some(path) => {
            let json = std::fs::read_to_string(path).map_err(|source| CatalogLoadError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            Catalog::from_json(&json)?
        }
        None => Catalog::from_json(EMBEDDED_CATALOG)?,
    };

    tracing::info!(
        products = catalog.products().len(),
        categories = catalog.categories().len(),
        source = %path.map_or_else(|| "embedded".to_string(), |p| p.display().to_string()),
        "Catalog loaded"
    );
    Ok(catalog)
}
