//! Catalog query engine.
//!
//! Resolves a [`CatalogFilter`] into one page of visible products plus the
//! total number of products matching the same filter.
//!
//! ## Query Flow
//!
//! ```text
//! CatalogFilter
//!   ↓
//! 1. Per active tag group: join-table lookup (OR within the group)
//!   ↓
//! 2. Intersect group results (AND across groups); stop on the first empty set
//!   ↓
//! 3. Empty intersection (or unknown status) → empty page, no further store calls
//!   ↓
//! 4. Build one ProductCriteria (ids ∩ visibility gate ∩ escaped search)
//!   ↓
//! 5. Count query, then page query (created_at DESC, id DESC) over the window
//! ```
//!
//! The engine holds no state between calls; concurrent queries share nothing
//! but the store handle.

use thiserror::Error;
use tracing::{debug, field, info_span, warn, Instrument};

use storefront_catalog::{CatalogFilter, CatalogPage, TagIntersection};
use storefront_core::ProductId;

use crate::read_model::{CatalogStore, ProductCriteria, ProductOrder, StoreError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogQueryError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Read-only query engine over a [`CatalogStore`].
#[derive(Debug, Clone)]
pub struct CatalogQueryEngine<S> {
    store: S,
}

impl<S> CatalogQueryEngine<S>
where
    S: CatalogStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn query(&self, filter: &CatalogFilter) -> Result<CatalogPage, CatalogQueryError> {
        let span = info_span!(
            "catalog.query",
            active_groups = filter.active_groups().count(),
            page = filter.page().page(),
            page_size = filter.page().page_size(),
            total_count = field::Empty,
        );

        async {
            let result = self.run(filter).await;
            match &result {
                Ok(page) => {
                    tracing::Span::current().record("total_count", page.total_count);
                }
                Err(e) => warn!(error = %e, "catalog query failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn run(&self, filter: &CatalogFilter) -> Result<CatalogPage, CatalogQueryError> {
        if filter.matches_nothing() {
            debug!("requested status matches no product; skipping store calls");
            return Ok(CatalogPage::empty());
        }

        let mut criteria = ProductCriteria::visible(filter.visibility());

        if let Some(matched) = self.match_tags(filter).await? {
            if matched.is_empty() {
                debug!("tag intersection is empty; skipping count and page queries");
                return Ok(CatalogPage::empty());
            }
            criteria = criteria.with_ids(matched);
        }

        if let Some(search) = filter.search() {
            criteria = criteria.with_search(search);
        }

        let total_count = self.store.count_products(&criteria).await?;
        let items = self
            .store
            .select_products(&criteria, ProductOrder::CreatedAtDesc, filter.page().window())
            .await?;

        Ok(CatalogPage { items, total_count })
    }

    /// `None` when no group is active; otherwise the ids matching every active group.
    async fn match_tags(
        &self,
        filter: &CatalogFilter,
    ) -> Result<Option<Vec<ProductId>>, StoreError> {
        let mut intersection = TagIntersection::new();

        for (group, tags) in filter.active_groups() {
            let tags: Vec<_> = tags.iter().copied().collect();
            let matches = self.store.product_ids_for_tags(&tags).await?;

            if intersection.absorb(matches).is_break() {
                debug!(group = %group, "no products left after tag group");
                break;
            }
        }

        Ok(intersection.finish())
    }
}
