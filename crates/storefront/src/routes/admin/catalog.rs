//! Category and product administration.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use chezflora_core::{CategoryId, ProductId};

use super::audit;
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::category::{Category, CategoryUpdate, NewCategory};
use crate::models::product::{NewProduct, Product, ProductUpdate};
use crate::routes::{ApiResponse, ApiResult, created};
use crate::services::catalog::CatalogService;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct DeleteCategoryQuery {
    /// Move the category's products to its parent instead of refusing.
    #[serde(default)]
    pub reassign: bool,
}

/// Body of a stock change. `null` stops tracking stock.
#[derive(Debug, Deserialize)]
pub struct StockUpdate {
    pub stock: Option<u32>,
}

/// GET /api/admin/categories
///
/// # Errors
///
/// Returns `AppError` if the store fails.
pub async fn list_categories(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> ApiResult<Vec<Category>> {
    Ok(ApiResponse::ok(
        CatalogService::new(state.store()).list_categories().await?,
    ))
}

/// POST /api/admin/categories
///
/// # Errors
///
/// Returns `AppError` for a duplicate id or an unknown parent.
#[instrument(skip_all)]
pub async fn add_category(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(data): Json<NewCategory>,
) -> Result<(StatusCode, ApiResponse<Category>)> {
    let category = CatalogService::new(state.store()).add_category(data).await?;
    audit(
        &state,
        &admin,
        "create",
        "category",
        category.id.as_str(),
        json!({ "name": category.name, "parentId": category.parent_id }),
    )
    .await;
    Ok(created("Category created", category))
}

/// PUT /api/admin/categories/{id}
///
/// # Errors
///
/// Returns `AppError` (404) for an unknown category, (400) if the new parent
/// would create a cycle.
#[instrument(skip_all, fields(category_id = %id))]
pub async fn update_category(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<CategoryId>,
    Json(data): Json<CategoryUpdate>,
) -> ApiResult<Category> {
    let category = CatalogService::new(state.store())
        .update_category(&id, data)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Category {id} not found")))?;
    audit(
        &state,
        &admin,
        "update",
        "category",
        id.as_str(),
        json!({ "name": category.name, "parentId": category.parent_id }),
    )
    .await;
    Ok(ApiResponse::with_message("Category updated", category))
}

/// DELETE /api/admin/categories/{id}?reassign=
///
/// # Errors
///
/// Returns `AppError` (404) for an unknown category, (409) if it still has
/// products and `reassign` is false.
#[instrument(skip_all, fields(category_id = %id))]
pub async fn delete_category(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<CategoryId>,
    Query(query): Query<DeleteCategoryQuery>,
) -> ApiResult<()> {
    let deleted = CatalogService::new(state.store())
        .delete_category(&id, query.reassign)
        .await?;
    if !deleted {
        return Err(AppError::NotFound(format!("Category {id} not found")));
    }
    audit(
        &state,
        &admin,
        "delete",
        "category",
        id.as_str(),
        json!({ "reassign": query.reassign }),
    )
    .await;
    Ok(ApiResponse::with_message("Category deleted", ()))
}

/// GET /api/admin/products
///
/// # Errors
///
/// Returns `AppError` if the store fails.
pub async fn list_products(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> ApiResult<Vec<Product>> {
    Ok(ApiResponse::ok(
        CatalogService::new(state.store()).list_products().await?,
    ))
}

/// POST /api/admin/products
///
/// # Errors
///
/// Returns `AppError` for a duplicate id or an unknown category.
#[instrument(skip_all)]
pub async fn add_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(data): Json<NewProduct>,
) -> Result<(StatusCode, ApiResponse<Product>)> {
    let product = CatalogService::new(state.store()).add_product(data).await?;
    audit(
        &state,
        &admin,
        "create",
        "product",
        product.id.as_str(),
        json!({ "name": product.name, "price": product.price, "stock": product.stock }),
    )
    .await;
    Ok(created("Product created", product))
}

/// PUT /api/admin/products/{id}
///
/// # Errors
///
/// Returns `AppError` (404) for an unknown product.
#[instrument(skip_all, fields(product_id = %id))]
pub async fn update_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ProductId>,
    Json(data): Json<ProductUpdate>,
) -> ApiResult<Product> {
    let product = CatalogService::new(state.store())
        .update_product(&id, data)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Product {id} not found")))?;
    audit(
        &state,
        &admin,
        "update",
        "product",
        id.as_str(),
        json!({ "price": product.price, "stock": product.stock }),
    )
    .await;
    Ok(ApiResponse::with_message("Product updated", product))
}

/// PUT /api/admin/products/{id}/stock
///
/// # Errors
///
/// Returns `AppError` (404) for an unknown product.
#[instrument(skip_all, fields(product_id = %id))]
pub async fn update_stock(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ProductId>,
    Json(body): Json<StockUpdate>,
) -> ApiResult<Product> {
    let product = CatalogService::new(state.store())
        .update_product_stock(&id, body.stock)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Product {id} not found")))?;
    audit(
        &state,
        &admin,
        "update_stock",
        "product",
        id.as_str(),
        json!({ "stock": body.stock }),
    )
    .await;
    Ok(ApiResponse::with_message("Stock updated", product))
}

/// DELETE /api/admin/products/{id}
///
/// # Errors
///
/// Returns `AppError` (404) for an unknown product.
#[instrument(skip_all, fields(product_id = %id))]
pub async fn delete_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ProductId>,
) -> ApiResult<()> {
    if !CatalogService::new(state.store()).delete_product(&id).await? {
        return Err(AppError::NotFound(format!("Product {id} not found")));
    }
    audit(&state, &admin, "delete", "product", id.as_str(), json!({})).await;
    Ok(ApiResponse::with_message("Product deleted", ()))
}
