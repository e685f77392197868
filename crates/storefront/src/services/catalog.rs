//! Catalog service: the category tree and the product inventory.

use std::collections::HashSet;

use chrono::Utc;
use thiserror::Error;
use tracing::{info, instrument};

use chezflora_core::{CategoryId, ProductId, slugify};

use crate::db::categories::CategoryRepository;
use crate::db::products::ProductRepository;
use crate::db::{KvStore, RepositoryError};
use crate::models::category::{Category, CategoryTree, CategoryUpdate, NewCategory};
use crate::models::product::{NewProduct, Product, ProductUpdate};

/// Errors that can occur during catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("storage error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("name must not be empty")]
    InvalidName,

    #[error("category {0} already exists")]
    DuplicateCategory(CategoryId),

    #[error("parent category {0} does not exist")]
    ParentNotFound(CategoryId),

    #[error("category {0} does not exist")]
    CategoryNotFound(CategoryId),

    /// Reparenting would make a category its own ancestor.
    #[error("moving {category} under {parent} would create a cycle")]
    CycleDetected {
        category: CategoryId,
        parent: CategoryId,
    },

    #[error("category {category} still has {count} products")]
    HasProducts { category: CategoryId, count: usize },

    #[error("product {0} already exists")]
    DuplicateProduct(ProductId),
}

/// Catalog service over an injected store.
pub struct CatalogService<'a, S> {
    categories: CategoryRepository<'a, S>,
    products: ProductRepository<'a, S>,
}

impl<'a, S: KvStore> CatalogService<'a, S> {
    /// Create a new catalog service.
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self {
            categories: CategoryRepository::new(store),
            products: ProductRepository::new(store),
        }
    }

    // =========================================================================
    // Category tree
    // =========================================================================

    /// Every category as a flat list.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the store fails.
    pub async fn list_categories(&self) -> Result<Vec<Category>, CatalogError> {
        Ok(self.categories.list().await?)
    }

    /// Root categories, sorted by `order`.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the store fails.
    pub async fn get_main_categories(&self) -> Result<Vec<Category>, CatalogError> {
        let all = self.categories.list().await?;
        Ok(CategoryTree::new(&all).main_categories().into_iter().cloned().collect())
    }

    /// Direct children of `parent_id`, sorted by `order`.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the store fails.
    pub async fn get_child_categories(
        &self,
        parent_id: &CategoryId,
    ) -> Result<Vec<Category>, CatalogError> {
        let all = self.categories.list().await?;
        Ok(CategoryTree::new(&all).children(parent_id).into_iter().cloned().collect())
    }

    /// Breadcrumb from the root down to `category_id`.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the store fails.
    pub async fn get_category_path(
        &self,
        category_id: &CategoryId,
    ) -> Result<Vec<Category>, CatalogError> {
        let all = self.categories.list().await?;
        Ok(CategoryTree::new(&all).path(category_id).into_iter().cloned().collect())
    }

    /// Every descendant id of `category_id`.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the store fails.
    pub async fn get_subcategory_ids(
        &self,
        category_id: &CategoryId,
    ) -> Result<Vec<CategoryId>, CatalogError> {
        let all = self.categories.list().await?;
        Ok(CategoryTree::new(&all).descendant_ids(category_id))
    }

    /// Create a category.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::InvalidName` for an empty name or slug,
    /// `CatalogError::DuplicateCategory` if the id is taken and
    /// `CatalogError::ParentNotFound` for an unknown parent.
    #[instrument(skip(self), fields(name = %data.name))]
    pub async fn add_category(&self, data: NewCategory) -> Result<Category, CatalogError> {
        let name = data.name.trim().to_owned();
        if name.is_empty() {
            return Err(CatalogError::InvalidName);
        }
        let id = match data.id {
            Some(id) => id,
            None => CategoryId::new(slugify(&name)),
        };
        if id.as_str().is_empty() {
            return Err(CatalogError::InvalidName);
        }

        let category = self
            .categories
            .mutate(|categories| {
                let tree = CategoryTree::new(categories);
                if tree.contains(&id) {
                    return Err(CatalogError::DuplicateCategory(id.clone()));
                }
                if let Some(parent) = &data.parent_id
                    && !tree.contains(parent)
                {
                    return Err(CatalogError::ParentNotFound(parent.clone()));
                }

                let now = Utc::now();
                let category = Category {
                    id: id.clone(),
                    name: name.clone(),
                    description: data.description.clone(),
                    parent_id: data.parent_id.clone(),
                    order: data
                        .order
                        .unwrap_or_else(|| tree.next_order(data.parent_id.as_ref())),
                    created_at: now,
                    updated_at: now,
                };
                categories.push(category.clone());
                Ok(category)
            })
            .await?;

        info!(category_id = %category.id, "Category created");
        Ok(category)
    }

    /// Update a category.
    ///
    /// # Returns
    ///
    /// The updated category, or `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::CycleDetected` if the new parent is the
    /// category itself or one of its descendants, and
    /// `CatalogError::ParentNotFound` for an unknown parent.
    #[instrument(skip(self, data), fields(category_id = %id))]
    pub async fn update_category(
        &self,
        id: &CategoryId,
        data: CategoryUpdate,
    ) -> Result<Option<Category>, CatalogError> {
        if data.name.as_ref().is_some_and(|name| name.trim().is_empty()) {
            return Err(CatalogError::InvalidName);
        }

        self.categories
            .mutate(|categories| {
                let tree = CategoryTree::new(categories);
                if !tree.contains(id) {
                    return Ok(None);
                }
                if let Some(Some(parent)) = &data.parent_id {
                    if !tree.contains(parent) {
                        return Err(CatalogError::ParentNotFound(parent.clone()));
                    }
                    if tree.would_create_cycle(id, parent) {
                        return Err(CatalogError::CycleDetected {
                            category: id.clone(),
                            parent: parent.clone(),
                        });
                    }
                }

                let Some(category) = categories.iter_mut().find(|c| &c.id == id) else {
                    return Ok(None);
                };
                if let Some(name) = &data.name {
                    category.name = name.trim().to_owned();
                }
                if let Some(description) = &data.description {
                    category.description.clone_from(description);
                }
                if let Some(parent_id) = &data.parent_id {
                    category.parent_id.clone_from(parent_id);
                }
                if let Some(order) = data.order {
                    category.order = order;
                }
                category.updated_at = Utc::now();
                Ok(Some(category.clone()))
            })
            .await
    }

    /// Delete a category, re-linking its children to its parent.
    ///
    /// Products filed directly under the category are moved to its parent,
    /// or to `uncategorized` for a root category, when `reassign_products`
    /// is set.
    ///
    /// # Returns
    ///
    /// Returns `true` if the category was deleted, `false` if it didn't exist.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::HasProducts` if products reference the
    /// category and `reassign_products` is false.
    #[instrument(skip(self), fields(category_id = %id))]
    pub async fn delete_category(
        &self,
        id: &CategoryId,
        reassign_products: bool,
    ) -> Result<bool, CatalogError> {
        let Some(category) = self.categories.get(id).await? else {
            return Ok(false);
        };
        let new_home = category
            .parent_id
            .clone()
            .unwrap_or_else(CategoryId::uncategorized);

        let moved = self
            .products
            .mutate(|products| {
                let count = products.iter().filter(|p| &p.category == id).count();
                if count > 0 && !reassign_products {
                    return Err(CatalogError::HasProducts {
                        category: id.clone(),
                        count,
                    });
                }
                let now = Utc::now();
                for product in products.iter_mut().filter(|p| &p.category == id) {
                    product.category = new_home.clone();
                    product.updated_at = now;
                }
                Ok(count)
            })
            .await?;

        let deleted = self
            .categories
            .mutate(|categories| {
                let Some(position) = categories.iter().position(|c| &c.id == id) else {
                    return Ok::<_, CatalogError>(false);
                };
                let removed = categories.remove(position);
                let now = Utc::now();
                for child in categories
                    .iter_mut()
                    .filter(|c| c.parent_id.as_ref() == Some(id))
                {
                    child.parent_id.clone_from(&removed.parent_id);
                    child.updated_at = now;
                }
                Ok(true)
            })
            .await?;

        if deleted {
            info!(products_moved = moved, new_home = %new_home, "Category deleted");
        }
        Ok(deleted)
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the store fails.
    pub async fn list_products(&self) -> Result<Vec<Product>, CatalogError> {
        Ok(self.products.list().await?)
    }

    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the store fails.
    pub async fn get_product(&self, id: &ProductId) -> Result<Option<Product>, CatalogError> {
        Ok(self.products.get(id).await?)
    }

    /// Create a product.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::CategoryNotFound` unless the category exists or
    /// is `uncategorized`, and `CatalogError::DuplicateProduct` if the id is
    /// taken.
    #[instrument(skip(self), fields(name = %data.name))]
    pub async fn add_product(&self, data: NewProduct) -> Result<Product, CatalogError> {
        let name = data.name.trim().to_owned();
        if name.is_empty() {
            return Err(CatalogError::InvalidName);
        }
        self.ensure_category(&data.category).await?;

        let id = data.id.clone().unwrap_or_else(ProductId::generate);
        let product = self
            .products
            .mutate(|products| {
                if products.iter().any(|p| p.id == id) {
                    return Err(CatalogError::DuplicateProduct(id.clone()));
                }
                let now = Utc::now();
                let product = Product {
                    id: id.clone(),
                    name: name.clone(),
                    description: data.description.clone(),
                    price: data.price,
                    stock: data.stock,
                    category: data.category.clone(),
                    images: data.images.clone(),
                    sku: data.sku.clone(),
                    popular: data.popular,
                    featured: data.featured,
                    created_at: now,
                    updated_at: now,
                };
                products.push(product.clone());
                Ok(product)
            })
            .await?;

        info!(product_id = %product.id, "Product created");
        Ok(product)
    }

    /// Update a product.
    ///
    /// # Returns
    ///
    /// The updated product, or `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::CategoryNotFound` when moving to an unknown category.
    #[instrument(skip(self, data), fields(product_id = %id))]
    pub async fn update_product(
        &self,
        id: &ProductId,
        data: ProductUpdate,
    ) -> Result<Option<Product>, CatalogError> {
        if data.name.as_ref().is_some_and(|name| name.trim().is_empty()) {
            return Err(CatalogError::InvalidName);
        }
        if let Some(category) = &data.category {
            self.ensure_category(category).await?;
        }

        Ok(self
            .products
            .update(id, |product| data.clone().apply_to(product))
            .await?)
    }

    /// Set or clear the tracked stock of a product.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the store fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn update_product_stock(
        &self,
        id: &ProductId,
        stock: Option<u32>,
    ) -> Result<Option<Product>, CatalogError> {
        Ok(self.products.update(id, |product| product.stock = stock).await?)
    }

    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the store fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn delete_product(&self, id: &ProductId) -> Result<bool, CatalogError> {
        Ok(self.products.delete(id).await?)
    }

    /// Products filed under `category_id`, and under its descendants when
    /// `include_subcategories` is set.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the store fails.
    pub async fn get_products_by_category(
        &self,
        category_id: &CategoryId,
        include_subcategories: bool,
    ) -> Result<Vec<Product>, CatalogError> {
        let mut wanted = HashSet::from([category_id.clone()]);
        if include_subcategories {
            wanted.extend(self.get_subcategory_ids(category_id).await?);
        }
        Ok(self
            .products
            .list()
            .await?
            .into_iter()
            .filter(|p| wanted.contains(&p.category))
            .collect())
    }

    /// Up to `limit` featured products.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the store fails.
    pub async fn get_featured_products(&self, limit: usize) -> Result<Vec<Product>, CatalogError> {
        Ok(self
            .products
            .list()
            .await?
            .into_iter()
            .filter(|p| p.featured)
            .take(limit)
            .collect())
    }

    /// Up to `limit` popular products.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the store fails.
    pub async fn get_popular_products(&self, limit: usize) -> Result<Vec<Product>, CatalogError> {
        Ok(self
            .products
            .list()
            .await?
            .into_iter()
            .filter(|p| p.popular)
            .take(limit)
            .collect())
    }

    /// Products whose name, description or SKU contains `query`.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the store fails.
    pub async fn search_products(&self, query: &str) -> Result<Vec<Product>, CatalogError> {
        let needle = query.trim().to_lowercase();
        let products = self.products.list().await?;
        if needle.is_empty() {
            return Ok(products);
        }
        Ok(products.into_iter().filter(|p| p.matches(&needle)).collect())
    }

    async fn ensure_category(&self, id: &CategoryId) -> Result<(), CatalogError> {
        if id.is_uncategorized() || self.categories.get(id).await?.is_some() {
            Ok(())
        } else {
            Err(CatalogError::CategoryNotFound(id.clone()))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chezflora_core::Money;

    use super::*;
    use crate::db::MemoryStore;

    fn new_category(name: &str, parent: Option<&str>) -> NewCategory {
        NewCategory {
            name: name.to_owned(),
            parent_id: parent.map(CategoryId::new),
            ..NewCategory::default()
        }
    }

    fn new_product(id: &str, category: &str) -> NewProduct {
        NewProduct {
            id: Some(ProductId::new(id)),
            name: format!("Bouquet {id}"),
            description: String::new(),
            price: Money::from_cents(2500),
            stock: Some(5),
            category: CategoryId::new(category),
            images: Vec::new(),
            sku: None,
            popular: false,
            featured: false,
        }
    }

    #[tokio::test]
    async fn test_add_category_derives_id_and_order() {
        let store = MemoryStore::new();
        let catalog = CatalogService::new(&store);

        let first = catalog.add_category(new_category("Fleurs Fraîches", None)).await.unwrap();
        let second = catalog.add_category(new_category("Plantes", None)).await.unwrap();
        assert_eq!(first.id.as_str(), "fleurs-fraiches");
        assert_eq!(first.order, 0);
        assert_eq!(second.order, 1);

        let err = catalog
            .add_category(new_category("Fleurs fraîches", None))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateCategory(_)));
    }

    #[tokio::test]
    async fn test_add_category_rejects_unknown_parent_and_empty_name() {
        let store = MemoryStore::new();
        let catalog = CatalogService::new(&store);
        assert!(matches!(
            catalog.add_category(new_category("Roses", Some("nope"))).await,
            Err(CatalogError::ParentNotFound(_))
        ));
        assert!(matches!(
            catalog.add_category(new_category("  ", None)).await,
            Err(CatalogError::InvalidName)
        ));
    }

    #[tokio::test]
    async fn test_path_ends_at_category_and_starts_at_root() {
        let store = MemoryStore::new();
        let catalog = CatalogService::new(&store);
        catalog.add_category(new_category("Bouquets", None)).await.unwrap();
        catalog.add_category(new_category("Roses", Some("bouquets"))).await.unwrap();
        catalog.add_category(new_category("Roses rouges", Some("roses"))).await.unwrap();

        let id = CategoryId::new("roses-rouges");
        let path = catalog.get_category_path(&id).await.unwrap();
        assert_eq!(path.last().map(|c| &c.id), Some(&id));
        assert!(path.first().is_some_and(|c| c.parent_id.is_none()));
        assert_eq!(path.len(), 3);
    }

    #[tokio::test]
    async fn test_reparent_cycle_is_rejected() {
        let store = MemoryStore::new();
        let catalog = CatalogService::new(&store);
        catalog.add_category(new_category("Bouquets", None)).await.unwrap();
        catalog.add_category(new_category("Roses", Some("bouquets"))).await.unwrap();

        let update = CategoryUpdate {
            parent_id: Some(Some(CategoryId::new("roses"))),
            ..CategoryUpdate::default()
        };
        let err = catalog
            .update_category(&CategoryId::new("bouquets"), update)
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::CycleDetected { .. }));

        let self_parent = CategoryUpdate {
            parent_id: Some(Some(CategoryId::new("roses"))),
            ..CategoryUpdate::default()
        };
        assert!(matches!(
            catalog.update_category(&CategoryId::new("roses"), self_parent).await,
            Err(CatalogError::CycleDetected { .. })
        ));

        let unknown = catalog
            .update_category(&CategoryId::new("missing"), CategoryUpdate::default())
            .await
            .unwrap();
        assert!(unknown.is_none());
    }

    #[tokio::test]
    async fn test_delete_category_reassigns_products_and_children() {
        let store = MemoryStore::new();
        let catalog = CatalogService::new(&store);
        catalog.add_category(new_category("A", None)).await.unwrap();
        catalog.add_category(new_category("B", Some("a"))).await.unwrap();
        catalog.add_category(new_category("C", Some("b"))).await.unwrap();
        catalog.add_product(new_product("p1", "b")).await.unwrap();
        catalog.add_product(new_product("p2", "b")).await.unwrap();

        let b = CategoryId::new("b");
        assert!(matches!(
            catalog.delete_category(&b, false).await,
            Err(CatalogError::HasProducts { count: 2, .. })
        ));

        assert!(catalog.delete_category(&b, true).await.unwrap());
        let products = catalog.list_products().await.unwrap();
        assert!(products.iter().all(|p| p.category.as_str() == "a"));
        let c = catalog.get_child_categories(&CategoryId::new("a")).await.unwrap();
        assert_eq!(c.len(), 1);
        assert_eq!(c.first().map(|c| c.id.as_str()), Some("c"));

        assert!(!catalog.delete_category(&b, true).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_root_category_moves_products_to_uncategorized() {
        let store = MemoryStore::new();
        let catalog = CatalogService::new(&store);
        catalog.add_category(new_category("A", None)).await.unwrap();
        catalog.add_product(new_product("p1", "a")).await.unwrap();

        assert!(catalog.delete_category(&CategoryId::new("a"), true).await.unwrap());
        let product = catalog.get_product(&ProductId::new("p1")).await.unwrap().unwrap();
        assert!(product.category.is_uncategorized());
    }

    #[tokio::test]
    async fn test_products_by_category_includes_descendants() {
        let store = MemoryStore::new();
        let catalog = CatalogService::new(&store);
        catalog.add_category(new_category("Bouquets", None)).await.unwrap();
        catalog.add_category(new_category("Roses", Some("bouquets"))).await.unwrap();
        catalog.add_product(new_product("p1", "bouquets")).await.unwrap();
        catalog.add_product(new_product("p2", "roses")).await.unwrap();

        let bouquets = CategoryId::new("bouquets");
        assert_eq!(catalog.get_products_by_category(&bouquets, true).await.unwrap().len(), 2);
        assert_eq!(catalog.get_products_by_category(&bouquets, false).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_add_product_requires_known_category() {
        let store = MemoryStore::new();
        let catalog = CatalogService::new(&store);
        assert!(matches!(
            catalog.add_product(new_product("p1", "ghost")).await,
            Err(CatalogError::CategoryNotFound(_))
        ));
        catalog.add_product(new_product("p1", "uncategorized")).await.unwrap();
        assert!(matches!(
            catalog.add_product(new_product("p1", "uncategorized")).await,
            Err(CatalogError::DuplicateProduct(_))
        ));
    }

    #[tokio::test]
    async fn test_update_stock_and_search() {
        let store = MemoryStore::new();
        let catalog = CatalogService::new(&store);
        catalog.add_product(new_product("pivoine", "uncategorized")).await.unwrap();

        let id = ProductId::new("pivoine");
        let updated = catalog.update_product_stock(&id, None).await.unwrap().unwrap();
        assert_eq!(updated.stock, None);
        assert!(catalog.update_product_stock(&ProductId::new("x"), Some(1)).await.unwrap().is_none());

        assert_eq!(catalog.search_products("PIVOINE").await.unwrap().len(), 1);
        assert!(catalog.search_products("tulipe").await.unwrap().is_empty());
    }
}
