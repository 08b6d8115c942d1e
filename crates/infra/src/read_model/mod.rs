//! Relational store boundary for the catalog.
//!
//! The catalog query engine only needs a handful of query shapes from the
//! store: a join-table lookup, a count and a projected, ordered, ranged
//! select, all sharing one filter description ([`ProductCriteria`]). Any
//! backend that can answer those (embedded SQL, Postgres, an HTTP data API)
//! satisfies the engine.

pub mod in_memory;
pub mod like;
pub mod postgres;

use std::sync::Arc;

use thiserror::Error;

use storefront_catalog::{
    Product, ProductAssets, ProductPatch, ProductSummary, RowRange, SearchText, Tag, TagGroup,
    Visibility,
};
use storefront_core::{ProductId, TagId};

pub use in_memory::InMemoryCatalogStore;
pub use postgres::PostgresCatalogStore;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The store could not be reached (pool exhausted, connection refused, ...).
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The store rejected or failed the query (malformed filter, permission, decode).
    #[error("query failed: {0}")]
    Query(String),

    /// A uniqueness or reference constraint rejected a write (duplicate slug, unknown tag).
    #[error("conflict: {0}")]
    Conflict(String),
}

/// Filter chain applied to the `products` table.
///
/// Every condition present is ANDed; the text pattern is matched against
/// title OR slug OR description.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductCriteria {
    /// `status = ? AND is_active = ?`; `None` for admin listings.
    pub visibility: Option<Visibility>,
    /// `id IN (...)`; `None` means unconstrained. An empty list matches nothing.
    pub ids: Option<Vec<ProductId>>,
    /// Already escaped `ILIKE` pattern (see [`SearchText::like_pattern`]).
    pub text_pattern: Option<String>,
}

impl ProductCriteria {
    pub fn visible(visibility: Visibility) -> Self {
        Self {
            visibility: Some(visibility),
            ..Self::default()
        }
    }

    pub fn with_ids(mut self, ids: Vec<ProductId>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn with_search(mut self, search: &SearchText) -> Self {
        self.text_pattern = Some(search.like_pattern());
        self
    }
}

/// Sort orders the catalog uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProductOrder {
    /// Newest first; equal timestamps fall back to `id DESC`.
    #[default]
    CreatedAtDesc,
}

/// How a single product is addressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProductKey {
    Id(ProductId),
    Slug(String),
}

impl ProductKey {
    /// UUID-shaped keys address by id, anything else by slug.
    pub fn parse(raw: &str) -> Option<Self> {
        let key = raw.trim();
        if key.is_empty() || key == "undefined" {
            return None;
        }
        Some(match key.parse::<ProductId>() {
            Ok(id) => ProductKey::Id(id),
            Err(_) => ProductKey::Slug(key.to_string()),
        })
    }
}

/// Read side of the relational store.
#[async_trait::async_trait]
pub trait CatalogStore: Send + Sync {
    /// `SELECT product_id FROM product_tags WHERE tag_id IN (...)`. May contain duplicates.
    async fn product_ids_for_tags(&self, tags: &[TagId]) -> Result<Vec<ProductId>, StoreError>;

    /// Count-only query; no projection, no range.
    async fn count_products(&self, criteria: &ProductCriteria) -> Result<u64, StoreError>;

    /// Projected rows in `order`, restricted to the inclusive `range`.
    async fn select_products(
        &self,
        criteria: &ProductCriteria,
        order: ProductOrder,
        range: RowRange,
    ) -> Result<Vec<ProductSummary>, StoreError>;

    async fn find_product(&self, key: &ProductKey) -> Result<Option<Product>, StoreError>;

    async fn tag_groups(&self) -> Result<Vec<TagGroup>, StoreError>;

    async fn tags(&self) -> Result<Vec<Tag>, StoreError>;
}

/// Back-office write path.
#[async_trait::async_trait]
pub trait ProductAdminStore: Send + Sync {
    /// All products, any status, newest first.
    async fn list_products(&self) -> Result<Vec<Product>, StoreError>;

    /// Insert a validated product together with its tag rows. Repeated tag
    /// ids collapse to one row; a taken slug or an unknown tag is a
    /// [`StoreError::Conflict`] and nothing is written.
    async fn create_product(&self, product: Product, tags: &[TagId]) -> Result<Product, StoreError>;

    /// Replace every tag row of a product. `false` when the product does not exist.
    async fn set_product_tags(&self, id: ProductId, tags: &[TagId]) -> Result<bool, StoreError>;

    /// Apply a validated patch; `None` when the product does not exist.
    async fn update_product(
        &self,
        id: ProductId,
        patch: &ProductPatch,
    ) -> Result<Option<Product>, StoreError>;

    /// Remove the product's tag rows, then the product. Returns the asset
    /// paths it owned, or `None` when it did not exist.
    async fn delete_product(&self, id: ProductId) -> Result<Option<ProductAssets>, StoreError>;
}

#[async_trait::async_trait]
impl<S> CatalogStore for Arc<S>
where
    S: CatalogStore + ?Sized,
{
    async fn product_ids_for_tags(&self, tags: &[TagId]) -> Result<Vec<ProductId>, StoreError> {
        (**self).product_ids_for_tags(tags).await
    }

    async fn count_products(&self, criteria: &ProductCriteria) -> Result<u64, StoreError> {
        (**self).count_products(criteria).await
    }

    async fn select_products(
        &self,
        criteria: &ProductCriteria,
        order: ProductOrder,
        range: RowRange,
    ) -> Result<Vec<ProductSummary>, StoreError> {
        (**self).select_products(criteria, order, range).await
    }

    async fn find_product(&self, key: &ProductKey) -> Result<Option<Product>, StoreError> {
        (**self).find_product(key).await
    }

    async fn tag_groups(&self) -> Result<Vec<TagGroup>, StoreError> {
        (**self).tag_groups().await
    }

    async fn tags(&self) -> Result<Vec<Tag>, StoreError> {
        (**self).tags().await
    }
}

#[async_trait::async_trait]
impl<S> ProductAdminStore for Arc<S>
where
    S: ProductAdminStore + ?Sized,
{
    async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        (**self).list_products().await
    }

    async fn create_product(&self, product: Product, tags: &[TagId]) -> Result<Product, StoreError> {
        (**self).create_product(product, tags).await
    }

    async fn set_product_tags(&self, id: ProductId, tags: &[TagId]) -> Result<bool, StoreError> {
        (**self).set_product_tags(id, tags).await
    }

    async fn update_product(
        &self,
        id: ProductId,
        patch: &ProductPatch,
    ) -> Result<Option<Product>, StoreError> {
        (**self).update_product(id, patch).await
    }

    async fn delete_product(&self, id: ProductId) -> Result<Option<ProductAssets>, StoreError> {
        (**self).delete_product(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_key_prefers_id_for_uuid_shapes() {
        let id = ProductId::new();
        assert_eq!(ProductKey::parse(&id.to_string()), Some(ProductKey::Id(id)));
        assert_eq!(
            ProductKey::parse(" grade-4-math "),
            Some(ProductKey::Slug("grade-4-math".to_string()))
        );
        assert_eq!(ProductKey::parse("   "), None);
        assert_eq!(ProductKey::parse("undefined"), None);
    }
}
