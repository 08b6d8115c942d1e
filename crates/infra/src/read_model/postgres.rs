//! Postgres-backed catalog store.
//!
//! Filters are assembled with [`sqlx::QueryBuilder`] so the count and the
//! page query are generated from the same [`ProductCriteria`] and can never
//! drift apart.
//!
//! ## Error Mapping
//!
//! | SQLx Error | StoreError | Scenario |
//! |------------|------------|----------|
//! | PoolClosed / PoolTimedOut / Io / Tls | `Unavailable` | Database unreachable or pool exhausted |
//! | Database 23505 / 23503 | `Conflict` | Duplicate slug or id, unknown tag |
//! | Database (other codes) | `Query` | Check violation, bad SQL, permission |
//! | ColumnDecode / Decode / other | `Query` | Row could not be read |

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Row};
use tracing::instrument;
use uuid::Uuid;

use storefront_catalog::{
    Price, Product, ProductAssets, ProductPatch, ProductStatus, ProductSummary, RowRange, Tag,
    TagGroup,
};
use storefront_core::{ProductId, TagGroupId, TagId};

use super::{CatalogStore, ProductAdminStore, ProductCriteria, ProductKey, ProductOrder, StoreError};

const SCHEMA: &str = include_str!("../../sql/catalog_schema.sql");

const PRODUCT_COLUMNS: &str = "id, title, slug, description, price_cents, currency, status, \
     is_active, cover_image_path, pdf_path, created_at, updated_at";

const SUMMARY_COLUMNS: &str =
    "id, title, slug, cover_image_path, pdf_path, created_at, updated_at, price_cents, currency";

/// Catalog store over a Postgres connection pool.
///
/// `Send + Sync`; clones share the pool.
#[derive(Debug, Clone)]
pub struct PostgresCatalogStore {
    pool: Arc<PgPool>,
}

impl PostgresCatalogStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Create the catalog tables and indexes if they do not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        Ok(())
    }
}

/// Append `WHERE ...` for the criteria. Every present condition is ANDed.
fn push_criteria(qb: &mut QueryBuilder<'_, Postgres>, criteria: &ProductCriteria) {
    qb.push(" WHERE TRUE");

    if let Some(visibility) = &criteria.visibility {
        qb.push(" AND status = ")
            .push_bind(visibility.status.as_str())
            .push(" AND is_active = ")
            .push_bind(visibility.is_active);
    }

    if let Some(ids) = &criteria.ids {
        let ids: Vec<Uuid> = ids.iter().map(|id| *id.as_uuid()).collect();
        qb.push(" AND id = ANY(").push_bind(ids).push(")");
    }

    if let Some(pattern) = &criteria.text_pattern {
        qb.push(" AND (title ILIKE ")
            .push_bind(pattern.clone())
            .push(r" ESCAPE '\' OR slug ILIKE ")
            .push_bind(pattern.clone())
            .push(r" ESCAPE '\' OR description ILIKE ")
            .push_bind(pattern.clone())
            .push(r" ESCAPE '\')");
    }
}

fn push_order(qb: &mut QueryBuilder<'_, Postgres>, order: ProductOrder) {
    match order {
        ProductOrder::CreatedAtDesc => qb.push(" ORDER BY created_at DESC, id DESC"),
    };
}

/// `INSERT` for the product's join rows, or `None` when there are no tags.
fn tag_rows_query(id: ProductId, tags: &[TagId]) -> Option<QueryBuilder<'static, Postgres>> {
    let tags: BTreeSet<Uuid> = tags.iter().map(|t| *t.as_uuid()).collect();
    if tags.is_empty() {
        return None;
    }

    let mut qb = QueryBuilder::<Postgres>::new("INSERT INTO product_tags (product_id, tag_id) ");
    qb.push_values(tags, |mut row, tag| {
        row.push_bind(*id.as_uuid()).push_bind(tag);
    });
    Some(qb)
}

fn to_i64(value: u64, what: &str) -> Result<i64, StoreError> {
    i64::try_from(value).map_err(|_| StoreError::Query(format!("{what} out of range: {value}")))
}

#[async_trait::async_trait]
impl CatalogStore for PostgresCatalogStore {
    #[instrument(skip(self), fields(tag_count = tags.len()), err)]
    async fn product_ids_for_tags(&self, tags: &[TagId]) -> Result<Vec<ProductId>, StoreError> {
        let tag_ids: Vec<Uuid> = tags.iter().map(|t| *t.as_uuid()).collect();

        let rows = sqlx::query("SELECT product_id FROM product_tags WHERE tag_id = ANY($1)")
            .bind(tag_ids)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("product_ids_for_tags", e))?;

        rows.iter()
            .map(|row| {
                row.try_get::<Uuid, _>("product_id")
                    .map(ProductId::from_uuid)
                    .map_err(|e| map_sqlx_error("product_ids_for_tags", e))
            })
            .collect()
    }

    #[instrument(skip(self, criteria), err)]
    async fn count_products(&self, criteria: &ProductCriteria) -> Result<u64, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) AS total FROM products");
        push_criteria(&mut qb, criteria);

        let row = qb
            .build()
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_products", e))?;
        let total: i64 = row
            .try_get("total")
            .map_err(|e| map_sqlx_error("count_products", e))?;

        Ok(u64::try_from(total).unwrap_or(0))
    }

    #[instrument(skip(self, criteria), fields(from = range.from, to = range.to), err)]
    async fn select_products(
        &self,
        criteria: &ProductCriteria,
        order: ProductOrder,
        range: RowRange,
    ) -> Result<Vec<ProductSummary>, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {SUMMARY_COLUMNS} FROM products"));
        push_criteria(&mut qb, criteria);
        push_order(&mut qb, order);
        qb.push(" LIMIT ")
            .push_bind(to_i64(range.limit(), "limit")?)
            .push(" OFFSET ")
            .push_bind(to_i64(range.offset(), "offset")?);

        let rows = qb
            .build()
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("select_products", e))?;

        rows.iter()
            .map(|row| {
                SummaryRow::from_row(row)
                    .map(Into::into)
                    .map_err(|e| map_sqlx_error("select_products", e))
            })
            .collect()
    }

    #[instrument(skip(self), err)]
    async fn find_product(&self, key: &ProductKey) -> Result<Option<Product>, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {PRODUCT_COLUMNS} FROM products"));
        match key {
            ProductKey::Id(id) => qb.push(" WHERE id = ").push_bind(*id.as_uuid()),
            ProductKey::Slug(slug) => qb.push(" WHERE slug = ").push_bind(slug.clone()),
        };

        let row = qb
            .build()
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_product", e))?;

        row.map(|row| product_from_row(&row)).transpose()
    }

    #[instrument(skip(self), err)]
    async fn tag_groups(&self) -> Result<Vec<TagGroup>, StoreError> {
        let rows = sqlx::query("SELECT id, name, slug, sort_order FROM tag_groups ORDER BY sort_order")
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("tag_groups", e))?;

        rows.iter()
            .map(|row| -> Result<TagGroup, sqlx::Error> {
                Ok(TagGroup {
                    id: TagGroupId::from_uuid(row.try_get("id")?),
                    name: row.try_get("name")?,
                    slug: row.try_get("slug")?,
                    sort_order: row.try_get("sort_order")?,
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| map_sqlx_error("tag_groups", e))
    }

    #[instrument(skip(self), err)]
    async fn tags(&self) -> Result<Vec<Tag>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, name, slug, tag_group_id, sort_order FROM tags ORDER BY sort_order",
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("tags", e))?;

        rows.iter()
            .map(|row| -> Result<Tag, sqlx::Error> {
                Ok(Tag {
                    id: TagId::from_uuid(row.try_get("id")?),
                    name: row.try_get("name")?,
                    slug: row.try_get("slug")?,
                    tag_group_id: TagGroupId::from_uuid(row.try_get("tag_group_id")?),
                    sort_order: row.try_get("sort_order")?,
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| map_sqlx_error("tags", e))
    }
}

#[async_trait::async_trait]
impl ProductAdminStore for PostgresCatalogStore {
    #[instrument(skip(self), err)]
    async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_products", e))?;

        rows.iter().map(product_from_row).collect()
    }

    #[instrument(skip(self, product), fields(product_id = %product.id, tag_count = tags.len()), err)]
    async fn create_product(&self, product: Product, tags: &[TagId]) -> Result<Product, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        sqlx::query(&format!(
            "INSERT INTO products ({PRODUCT_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)"
        ))
        .bind(*product.id.as_uuid())
        .bind(&product.title)
        .bind(&product.slug)
        .bind(&product.description)
        .bind(product.price.amount_cents)
        .bind(&product.price.currency)
        .bind(product.status.as_str())
        .bind(product.is_active)
        .bind(&product.cover_image_path)
        .bind(&product.pdf_path)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("create_product", e))?;

        if let Some(mut qb) = tag_rows_query(product.id, tags) {
            qb.build()
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("create_product_tags", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        Ok(product)
    }

    #[instrument(skip(self), fields(product_id = %id, tag_count = tags.len()), err)]
    async fn set_product_tags(&self, id: ProductId, tags: &[TagId]) -> Result<bool, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let exists = sqlx::query("SELECT id FROM products WHERE id = $1 FOR UPDATE")
            .bind(*id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("set_product_tags", e))?
            .is_some();
        if !exists {
            return Ok(false);
        }

        sqlx::query("DELETE FROM product_tags WHERE product_id = $1")
            .bind(*id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("set_product_tags", e))?;

        if let Some(mut qb) = tag_rows_query(id, tags) {
            qb.build()
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("set_product_tags", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        Ok(true)
    }

    /// Read-modify-write under a row lock, so concurrent patches serialize.
    #[instrument(skip(self, patch), fields(product_id = %id), err)]
    async fn update_product(
        &self,
        id: ProductId,
        patch: &ProductPatch,
    ) -> Result<Option<Product>, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let row = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1 FOR UPDATE"
        ))
        .bind(*id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_product", e))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut product = product_from_row(&row)?;
        product
            .apply_patch(patch, Utc::now())
            .map_err(|e| StoreError::Query(e.to_string()))?;

        sqlx::query(
            r#"
            UPDATE products SET
                title = $2,
                slug = $3,
                description = $4,
                price_cents = $5,
                currency = $6,
                status = $7,
                is_active = $8,
                cover_image_path = $9,
                pdf_path = $10,
                updated_at = $11
            WHERE id = $1
            "#,
        )
        .bind(*product.id.as_uuid())
        .bind(&product.title)
        .bind(&product.slug)
        .bind(&product.description)
        .bind(product.price.amount_cents)
        .bind(&product.price.currency)
        .bind(product.status.as_str())
        .bind(product.is_active)
        .bind(&product.cover_image_path)
        .bind(&product.pdf_path)
        .bind(product.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_product", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        Ok(Some(product))
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn delete_product(&self, id: ProductId) -> Result<Option<ProductAssets>, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let row = sqlx::query(
            "SELECT cover_image_path, pdf_path FROM products WHERE id = $1 FOR UPDATE",
        )
        .bind(*id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("delete_product", e))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let assets = ProductAssets {
            cover_image_path: row
                .try_get("cover_image_path")
                .map_err(|e| map_sqlx_error("delete_product", e))?,
            pdf_path: row
                .try_get("pdf_path")
                .map_err(|e| map_sqlx_error("delete_product", e))?,
        };

        sqlx::query("DELETE FROM product_tags WHERE product_id = $1")
            .bind(*id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_product_tags", e))?;

        sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(*id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_product", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        Ok(Some(assets))
    }
}

/// Map SQLx errors to StoreError.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            classify_database_error(operation, db_err.code().as_deref(), db_err.message())
        }
        sqlx::Error::PoolClosed | sqlx::Error::PoolTimedOut => {
            StoreError::Unavailable(format!("connection pool unavailable in {}", operation))
        }
        sqlx::Error::Io(e) => StoreError::Unavailable(format!("io error in {}: {}", operation, e)),
        sqlx::Error::Tls(e) => StoreError::Unavailable(format!("tls error in {}: {}", operation, e)),
        _ => StoreError::Query(format!("sqlx error in {}: {}", operation, err)),
    }
}

/// Map a Postgres SQLSTATE to StoreError.
fn classify_database_error(operation: &str, code: Option<&str>, message: &str) -> StoreError {
    let msg = format!("database error in {}: {}", operation, message);
    match code {
        // unique_violation: slug or primary key already taken
        Some("23505") => StoreError::Conflict(format!("{msg} (duplicate value)")),
        // foreign_key_violation: tag id that does not exist
        Some("23503") => StoreError::Conflict(format!("{msg} (unknown reference)")),
        _ => StoreError::Query(msg),
    }
}

// SQLx row types

struct SummaryRow {
    id: Uuid,
    title: String,
    slug: String,
    cover_image_path: Option<String>,
    pdf_path: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    price_cents: i64,
    currency: String,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for SummaryRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(SummaryRow {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            slug: row.try_get("slug")?,
            cover_image_path: row.try_get("cover_image_path")?,
            pdf_path: row.try_get("pdf_path")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            price_cents: row.try_get("price_cents")?,
            currency: row.try_get("currency")?,
        })
    }
}

impl From<SummaryRow> for ProductSummary {
    fn from(row: SummaryRow) -> Self {
        ProductSummary {
            id: ProductId::from_uuid(row.id),
            title: row.title,
            slug: row.slug,
            cover_image_path: row.cover_image_path,
            pdf_path: row.pdf_path,
            created_at: row.created_at,
            updated_at: row.updated_at,
            price_cents: row.price_cents,
            currency: row.currency,
        }
    }
}

fn product_from_row(row: &sqlx::postgres::PgRow) -> Result<Product, StoreError> {
    let get = |e: sqlx::Error| map_sqlx_error("decode_product", e);

    let status: String = row.try_get("status").map_err(get)?;
    let status = status
        .parse::<ProductStatus>()
        .map_err(|e| StoreError::Query(format!("failed to decode product status: {e}")))?;

    // Stored prices are trusted; the CHECK constraint already rejects negatives.
    let price = Price {
        amount_cents: row.try_get("price_cents").map_err(get)?,
        currency: row.try_get("currency").map_err(get)?,
    };

    Ok(Product {
        id: ProductId::from_uuid(row.try_get("id").map_err(get)?),
        title: row.try_get("title").map_err(get)?,
        slug: row.try_get("slug").map_err(get)?,
        description: row.try_get("description").map_err(get)?,
        price,
        status,
        is_active: row.try_get("is_active").map_err(get)?,
        cover_image_path: row.try_get("cover_image_path").map_err(get)?,
        pdf_path: row.try_get("pdf_path").map_err(get)?,
        created_at: row.try_get("created_at").map_err(get)?,
        updated_at: row.try_get("updated_at").map_err(get)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_catalog::{SearchText, Visibility};

    #[test]
    fn criteria_render_in_a_fixed_order() {
        let criteria = ProductCriteria::visible(Visibility::PUBLIC)
            .with_ids(vec![ProductId::new()])
            .with_search(&SearchText::parse("50%").unwrap());

        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM products");
        push_criteria(&mut qb, &criteria);
        push_order(&mut qb, ProductOrder::CreatedAtDesc);

        assert_eq!(
            qb.sql(),
            r"SELECT COUNT(*) FROM products WHERE TRUE AND status = $1 AND is_active = $2 AND id = ANY($3) AND (title ILIKE $4 ESCAPE '\' OR slug ILIKE $5 ESCAPE '\' OR description ILIKE $6 ESCAPE '\') ORDER BY created_at DESC, id DESC"
        );
    }

    #[test]
    fn unconstrained_criteria_match_everything() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 FROM products");
        push_criteria(&mut qb, &ProductCriteria::default());
        assert_eq!(qb.sql(), "SELECT 1 FROM products WHERE TRUE");
    }

    #[test]
    fn tag_rows_are_deduplicated_into_one_insert() {
        let id = ProductId::new();
        let a = TagId::new();
        let b = TagId::new();

        let qb = tag_rows_query(id, &[a, b, a]).unwrap();
        assert_eq!(
            qb.sql(),
            "INSERT INTO product_tags (product_id, tag_id) VALUES ($1, $2), ($3, $4)"
        );
        assert!(tag_rows_query(id, &[]).is_none());
    }

    #[test]
    fn constraint_violations_are_conflicts() {
        assert!(matches!(
            classify_database_error("update_product", Some("23505"), "products_slug_key"),
            StoreError::Conflict(_)
        ));
        assert!(matches!(
            classify_database_error("create_product_tags", Some("23503"), "product_tags_tag_id_fkey"),
            StoreError::Conflict(_)
        ));
        assert!(matches!(
            classify_database_error("create_product", Some("23514"), "products_price_cents_check"),
            StoreError::Query(_)
        ));
        assert!(matches!(
            classify_database_error("tags", None, "syntax error"),
            StoreError::Query(_)
        ));
    }

    #[test]
    fn pool_errors_are_unavailable() {
        assert!(matches!(
            map_sqlx_error("x", sqlx::Error::PoolTimedOut),
            StoreError::Unavailable(_)
        ));
        assert!(matches!(
            map_sqlx_error("x", sqlx::Error::RowNotFound),
            StoreError::Query(_)
        ));
    }
}
