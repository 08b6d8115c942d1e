//! Pagination arithmetic.

use serde::{Deserialize, Serialize};

use storefront_core::{DomainError, DomainResult};

use crate::product::ProductSummary;

pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Zero-based page cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageRequest {
    page: u32,
    page_size: u32,
}

impl PageRequest {
    pub fn new(page: u32, page_size: u32) -> DomainResult<Self> {
        if page_size == 0 {
            return Err(DomainError::validation("pageSize must be at least 1"));
        }
        Ok(Self { page, page_size })
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Inclusive row window for this page: `from = page * size`, `to = from + size - 1`.
    pub fn window(&self) -> RowRange {
        let from = u64::from(self.page) * u64::from(self.page_size);
        RowRange {
            from,
            to: from + u64::from(self.page_size) - 1,
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 0,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Inclusive `[from, to]` row range, as understood by the relational store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RowRange {
    pub from: u64,
    pub to: u64,
}

impl RowRange {
    pub fn offset(&self) -> u64 {
        self.from
    }

    pub fn limit(&self) -> u64 {
        (self.to + 1).saturating_sub(self.from)
    }
}

/// One page of catalog results plus the total across all pages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CatalogPage {
    pub items: Vec<ProductSummary>,
    pub total_count: u64,
}

impl CatalogPage {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of pages needed to show `total_count` rows.
    pub fn page_count(&self, page_size: u32) -> u64 {
        self.total_count.div_ceil(u64::from(page_size.max(1)))
    }

    pub fn has_more_after(&self, request: &PageRequest) -> bool {
        u64::from(request.page()) + 1 < self.page_count(request.page_size())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn first_page_window() {
        let w = PageRequest::new(0, 20).unwrap().window();
        assert_eq!((w.from, w.to), (0, 19));
        assert_eq!(w.limit(), 20);
    }

    #[test]
    fn zero_page_size_is_rejected() {
        assert!(PageRequest::new(3, 0).is_err());
    }

    #[test]
    fn page_count_and_has_more() {
        let page = CatalogPage { items: vec![], total_count: 41 };
        assert_eq!(page.page_count(20), 3);
        assert!(page.has_more_after(&PageRequest::new(1, 20).unwrap()));
        assert!(!page.has_more_after(&PageRequest::new(2, 20).unwrap()));
        assert_eq!(CatalogPage::empty().page_count(20), 0);
    }

    proptest! {
        /// Consecutive pages tile the row space without gaps or overlap.
        #[test]
        fn windows_are_contiguous(page in 0u32..10_000, size in 1u32..500) {
            let this = PageRequest::new(page, size).unwrap().window();
            let next = PageRequest::new(page + 1, size).unwrap().window();
            prop_assert_eq!(this.limit(), u64::from(size));
            prop_assert_eq!(this.to + 1, next.from);
        }
    }
}
