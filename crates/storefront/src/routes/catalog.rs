//! Public catalog route handlers.

use axum::extract::{Path, Query, State};
use serde::Deserialize;

use chezflora_core::{CategoryId, ProductId};

use crate::error::AppError;
use crate::models::category::Category;
use crate::models::product::Product;
use crate::routes::{ApiResponse, ApiResult};
use crate::services::catalog::CatalogService;
use crate::state::AppState;

/// Number of products in the featured and popular lists when not specified.
const DEFAULT_SHOWCASE_LIMIT: usize = 8;

/// Query parameters for the category listing.
#[derive(Debug, Default, Deserialize)]
pub struct CategoryQuery {
    /// Only root categories.
    #[serde(default)]
    pub main: bool,
}

/// Query parameters for the product listing.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductQuery {
    pub category: Option<CategoryId>,
    #[serde(default)]
    pub include_subcategories: bool,
    /// Free-text search on name, description and SKU.
    pub q: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

/// GET /api/categories
///
/// # Errors
///
/// Returns `AppError` if the store fails.
pub async fn categories(
    State(state): State<AppState>,
    Query(query): Query<CategoryQuery>,
) -> ApiResult<Vec<Category>> {
    let catalog = CatalogService::new(state.store());
    let categories = if query.main {
        catalog.get_main_categories().await?
    } else {
        catalog.list_categories().await?
    };
    Ok(ApiResponse::ok(categories))
}

/// GET /api/categories/{id}/children
///
/// # Errors
///
/// Returns `AppError` (404) for an unknown category.
pub async fn children(
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
) -> ApiResult<Vec<Category>> {
    let catalog = CatalogService::new(state.store());
    let path = catalog.get_category_path(&id).await?;
    if path.is_empty() {
        return Err(AppError::NotFound(format!("Category {id} not found")));
    }
    Ok(ApiResponse::ok(catalog.get_child_categories(&id).await?))
}

/// GET /api/categories/{id}/path
///
/// Breadcrumb from the root down to the category.
///
/// # Errors
///
/// Returns `AppError` (404) for an unknown category.
pub async fn path(
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
) -> ApiResult<Vec<Category>> {
    let path = CatalogService::new(state.store())
        .get_category_path(&id)
        .await?;
    if path.is_empty() {
        return Err(AppError::NotFound(format!("Category {id} not found")));
    }
    Ok(ApiResponse::ok(path))
}

/// GET /api/products?category=&includeSubcategories=&q=
///
/// # Errors
///
/// Returns `AppError` if the store fails.
pub async fn products(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> ApiResult<Vec<Product>> {
    let catalog = CatalogService::new(state.store());
    let needle = query
        .q
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(str::to_lowercase);

    let products = match (&query.category, needle) {
        (Some(category), needle) => {
            let mut products = catalog
                .get_products_by_category(category, query.include_subcategories)
                .await?;
            if let Some(needle) = needle {
                products.retain(|p| p.matches(&needle));
            }
            products
        }
        (None, Some(needle)) => catalog.search_products(&needle).await?,
        (None, None) => catalog.list_products().await?,
    };

    Ok(ApiResponse::ok(products))
}

/// GET /api/products/featured
///
/// # Errors
///
/// Returns `AppError` if the store fails.
pub async fn featured(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> ApiResult<Vec<Product>> {
    let limit = query.limit.unwrap_or(DEFAULT_SHOWCASE_LIMIT);
    let products = CatalogService::new(state.store())
        .get_featured_products(limit)
        .await?;
    Ok(ApiResponse::ok(products))
}

/// GET /api/products/popular
///
/// # Errors
///
/// Returns `AppError` if the store fails.
pub async fn popular(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> ApiResult<Vec<Product>> {
    let limit = query.limit.unwrap_or(DEFAULT_SHOWCASE_LIMIT);
    let products = CatalogService::new(state.store())
        .get_popular_products(limit)
        .await?;
    Ok(ApiResponse::ok(products))
}

/// GET /api/products/{id}
///
/// # Errors
///
/// Returns `AppError` (404) for an unknown product.
pub async fn product(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> ApiResult<Product> {
    CatalogService::new(state.store())
        .get_product(&id)
        .await?
        .map(ApiResponse::ok)
        .ok_or_else(|| AppError::NotFound(format!("Product {id} not found")))
}
