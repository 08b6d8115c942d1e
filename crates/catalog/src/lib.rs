//! Catalog domain module.
//!
//! This crate contains the storefront's catalog rules (products, tag groups,
//! the catalog filter and its encoding, search escaping, pagination
//! arithmetic and tag intersection), implemented purely as deterministic
//! domain logic (no IO, no HTTP, no storage).

pub mod filter;
pub mod intersection;
pub mod page;
pub mod product;
pub mod search;
pub mod tag;

pub use filter::CatalogFilter;
pub use intersection::TagIntersection;
pub use page::{CatalogPage, DEFAULT_PAGE_SIZE, PageRequest, RowRange};
pub use product::{
    NewProduct, Price, Product, ProductAssets, ProductDetail, ProductPatch, ProductStatus,
    ProductSummary, Visibility,
};
pub use search::SearchText;
pub use tag::{Facet, ProductTag, Tag, TagGroup, TagGroupSlug, build_facets};
