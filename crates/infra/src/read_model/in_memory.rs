use std::collections::{BTreeSet, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;

use storefront_catalog::{
    Product, ProductAssets, ProductPatch, ProductSummary, ProductTag, RowRange, Tag, TagGroup,
};
use storefront_core::{ProductId, TagId};

use super::like::ilike;
use super::{CatalogStore, ProductAdminStore, ProductCriteria, ProductKey, ProductOrder, StoreError};

#[derive(Debug, Default)]
struct Tables {
    products: HashMap<ProductId, Product>,
    tag_groups: Vec<TagGroup>,
    tags: Vec<Tag>,
    product_tags: Vec<ProductTag>,
}

/// In-memory catalog store for tests/dev.
///
/// Evaluates the same filter chain as the Postgres store, including `ILIKE`
/// escaping, so engine behavior can be tested without a database.
#[derive(Debug, Default)]
pub struct InMemoryCatalogStore {
    inner: RwLock<Tables>,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a product by id. The slug must not belong to another product.
    pub fn insert_product(&self, product: Product) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        ensure_slug_free(&tables, &product.slug, product.id)?;
        tables.products.insert(product.id, product);
        Ok(())
    }

    pub fn insert_tag_group(&self, group: TagGroup) -> Result<(), StoreError> {
        self.write()?.tag_groups.push(group);
        Ok(())
    }

    pub fn insert_tag(&self, tag: Tag) -> Result<(), StoreError> {
        self.write()?.tags.push(tag);
        Ok(())
    }

    /// Add a raw join row. Duplicates are kept, like a join table without a
    /// unique constraint would.
    pub fn tag_product(&self, product_id: ProductId, tag_id: TagId) -> Result<(), StoreError> {
        self.write()?.product_tags.push(ProductTag { product_id, tag_id });
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StoreError> {
        self.inner
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, StoreError> {
        self.inner
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))
    }
}

fn ensure_slug_free(tables: &Tables, slug: &str, owner: ProductId) -> Result<(), StoreError> {
    if tables.products.values().any(|p| p.slug == slug && p.id != owner) {
        return Err(StoreError::Conflict(format!("slug '{slug}' is already in use")));
    }
    Ok(())
}

/// Deduplicate `tags`, rejecting ids missing from the tags table.
fn known_tags(tables: &Tables, tags: &[TagId]) -> Result<BTreeSet<TagId>, StoreError> {
    let wanted: BTreeSet<TagId> = tags.iter().copied().collect();
    match wanted.iter().find(|id| !tables.tags.iter().any(|t| t.id == **id)) {
        Some(unknown) => Err(StoreError::Conflict(format!("unknown tag {unknown}"))),
        None => Ok(wanted),
    }
}

fn admits(criteria: &ProductCriteria, product: &Product) -> bool {
    if let Some(visibility) = &criteria.visibility {
        if !visibility.admits(product) {
            return false;
        }
    }
    if let Some(ids) = &criteria.ids {
        if !ids.contains(&product.id) {
            return false;
        }
    }
    if let Some(pattern) = &criteria.text_pattern {
        let description = product.description.as_deref().unwrap_or("");
        if !(ilike(&product.title, pattern)
            || ilike(&product.slug, pattern)
            || ilike(description, pattern))
        {
            return false;
        }
    }
    true
}

fn sorted<'a>(mut rows: Vec<&'a Product>, order: ProductOrder) -> Vec<&'a Product> {
    match order {
        ProductOrder::CreatedAtDesc => {
            rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)))
        }
    }
    rows
}

#[async_trait::async_trait]
impl CatalogStore for InMemoryCatalogStore {
    async fn product_ids_for_tags(&self, tags: &[TagId]) -> Result<Vec<ProductId>, StoreError> {
        let tables = self.read()?;
        Ok(tables
            .product_tags
            .iter()
            .filter(|row| tags.contains(&row.tag_id))
            .map(|row| row.product_id)
            .collect())
    }

    async fn count_products(&self, criteria: &ProductCriteria) -> Result<u64, StoreError> {
        let tables = self.read()?;
        let n = tables.products.values().filter(|p| admits(criteria, p)).count();
        Ok(n as u64)
    }

    async fn select_products(
        &self,
        criteria: &ProductCriteria,
        order: ProductOrder,
        range: RowRange,
    ) -> Result<Vec<ProductSummary>, StoreError> {
        let tables = self.read()?;
        let rows: Vec<&Product> = tables.products.values().filter(|p| admits(criteria, p)).collect();

        let offset = usize::try_from(range.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(range.limit()).unwrap_or(usize::MAX);

        Ok(sorted(rows, order)
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(Product::summary)
            .collect())
    }

    async fn find_product(&self, key: &ProductKey) -> Result<Option<Product>, StoreError> {
        let tables = self.read()?;
        Ok(match key {
            ProductKey::Id(id) => tables.products.get(id).cloned(),
            ProductKey::Slug(slug) => tables.products.values().find(|p| &p.slug == slug).cloned(),
        })
    }

    async fn tag_groups(&self) -> Result<Vec<TagGroup>, StoreError> {
        Ok(self.read()?.tag_groups.clone())
    }

    async fn tags(&self) -> Result<Vec<Tag>, StoreError> {
        Ok(self.read()?.tags.clone())
    }
}

#[async_trait::async_trait]
impl ProductAdminStore for InMemoryCatalogStore {
    async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        let tables = self.read()?;
        let rows: Vec<&Product> = tables.products.values().collect();
        Ok(sorted(rows, ProductOrder::CreatedAtDesc).into_iter().cloned().collect())
    }

    async fn create_product(&self, product: Product, tags: &[TagId]) -> Result<Product, StoreError> {
        let mut tables = self.write()?;
        if tables.products.contains_key(&product.id) {
            return Err(StoreError::Conflict(format!("product {} already exists", product.id)));
        }
        ensure_slug_free(&tables, &product.slug, product.id)?;
        let tags = known_tags(&tables, tags)?;

        tables.product_tags.extend(tags.into_iter().map(|tag_id| ProductTag {
            product_id: product.id,
            tag_id,
        }));
        tables.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn set_product_tags(&self, id: ProductId, tags: &[TagId]) -> Result<bool, StoreError> {
        let mut tables = self.write()?;
        if !tables.products.contains_key(&id) {
            return Ok(false);
        }
        let tags = known_tags(&tables, tags)?;

        tables.product_tags.retain(|row| row.product_id != id);
        tables
            .product_tags
            .extend(tags.into_iter().map(|tag_id| ProductTag { product_id: id, tag_id }));
        Ok(true)
    }

    async fn update_product(
        &self,
        id: ProductId,
        patch: &ProductPatch,
    ) -> Result<Option<Product>, StoreError> {
        let mut tables = self.write()?;
        let Some(product) = tables.products.get(&id) else {
            return Ok(None);
        };

        let mut updated = product.clone();
        updated
            .apply_patch(patch, Utc::now())
            .map_err(|e| StoreError::Query(e.to_string()))?;
        ensure_slug_free(&tables, &updated.slug, id)?;

        tables.products.insert(id, updated.clone());
        Ok(Some(updated))
    }

    async fn delete_product(&self, id: ProductId) -> Result<Option<ProductAssets>, StoreError> {
        let mut tables = self.write()?;
        tables.product_tags.retain(|row| row.product_id != id);
        Ok(tables.products.remove(&id).map(|p| p.assets()))
    }
}
