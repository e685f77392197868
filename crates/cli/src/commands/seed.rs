//! Seed the catalog from a YAML file.
//!
//! The file lists categories (parents before children) and products:
//!
//! ```yaml
//! categories:
//!   - id: bouquets
//!     name: Bouquets
//! products:
//!   - id: rose-bouquet
//!     name: Bouquet de roses
//!     price: "45.00"
//!     stock: 12
//!     category: bouquets
//! ```
//!
//! Entries whose id already exists are skipped, so the command can be re-run.

use std::path::Path;

use serde::Deserialize;
use tracing::{error, info, warn};

use chezflora_storefront::models::category::NewCategory;
use chezflora_storefront::models::product::NewProduct;
use chezflora_storefront::services::catalog::{CatalogError, CatalogService};

use super::connect_store;

/// Contents of a catalog seed file.
#[derive(Debug, Default, Deserialize)]
pub struct CatalogSeed {
    #[serde(default)]
    pub categories: Vec<NewCategory>,
    #[serde(default)]
    pub products: Vec<NewProduct>,
}

/// Counts reported after seeding.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedResult {
    pub inserted: usize,
    pub skipped: usize,
}

/// Problems found in a seed file before touching the database.
#[must_use]
pub fn validate_seed(seed: &CatalogSeed) -> Vec<String> {
    let mut errors = Vec::new();

    for (i, category) in seed.categories.iter().enumerate() {
        if category.name.trim().is_empty() {
            errors.push(format!("categories[{i}]: name is empty"));
        }
    }
    for (i, product) in seed.products.iter().enumerate() {
        if product.name.trim().is_empty() {
            errors.push(format!("products[{i}]: name is empty"));
        }
        if product.category.as_str().is_empty() {
            errors.push(format!("products[{i}]: category is empty"));
        }
    }

    errors
}

/// Seed categories and products from `file_path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, fails validation,
/// or a catalog operation fails for a reason other than a duplicate id.
pub async fn catalog(file_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading catalog from file");
    let content = tokio::fs::read_to_string(path).await?;
    let seed: CatalogSeed = serde_yaml::from_str(&content)?;
    info!(
        categories = seed.categories.len(),
        products = seed.products.len(),
        "Parsed catalog"
    );

    let errors = validate_seed(&seed);
    if !errors.is_empty() {
        error!("Catalog validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(format!("{} validation errors found", errors.len()).into());
    }

    let store = connect_store().await?;
    let catalog = CatalogService::new(&store);

    let categories = seed_categories(&catalog, seed.categories).await?;
    let products = seed_products(&catalog, seed.products).await?;

    info!("Seeding complete!");
    info!("  Categories inserted: {}", categories.inserted);
    info!("  Categories skipped (already exist): {}", categories.skipped);
    info!("  Products inserted: {}", products.inserted);
    info!("  Products skipped (already exist): {}", products.skipped);

    Ok(())
}

async fn seed_categories<S: chezflora_storefront::db::KvStore>(
    catalog: &CatalogService<'_, S>,
    categories: Vec<NewCategory>,
) -> Result<SeedResult, CatalogError> {
    let mut result = SeedResult::default();
    for category in categories {
        let name = category.name.clone();
        match catalog.add_category(category).await {
            Ok(created) => {
                info!(id = %created.id, "Category created");
                result.inserted += 1;
            }
            Err(CatalogError::DuplicateCategory(id)) => {
                warn!(%id, %name, "Category exists, skipping");
                result.skipped += 1;
            }
            Err(e) => return Err(e),
        }
    }
    Ok(result)
}

async fn seed_products<S: chezflora_storefront::db::KvStore>(
    catalog: &CatalogService<'_, S>,
    products: Vec<NewProduct>,
) -> Result<SeedResult, CatalogError> {
    let mut result = SeedResult::default();
    for product in products {
        let name = product.name.clone();
        match catalog.add_product(product).await {
            Ok(created) => {
                info!(id = %created.id, "Product created");
                result.inserted += 1;
            }
            Err(CatalogError::DuplicateProduct(id)) => {
                warn!(%id, %name, "Product exists, skipping");
                result.skipped += 1;
            }
            Err(e) => return Err(e),
        }
    }
    Ok(result)
}
