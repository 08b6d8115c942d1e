//! Infrastructure layer: relational store adapters, the catalog query engine
//! and the object store boundary.

pub mod catalog_query;
pub mod object_store;
pub mod read_model;

pub use catalog_query::{CatalogQueryEngine, CatalogQueryError};
pub use object_store::{InMemoryObjectStore, ObjectStore, ObjectStoreError, UrlSigner};
pub use read_model::{
    CatalogStore, InMemoryCatalogStore, PostgresCatalogStore, ProductAdminStore, ProductCriteria,
    ProductKey, StoreError,
};
