//! `storefront-core`: shared building blocks for the storefront crates.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod error;
pub mod id;
pub mod value_object;

pub use error::{DomainError, DomainResult};
pub use id::{ProductId, TagGroupId, TagId, UserId};
pub use value_object::ValueObject;
