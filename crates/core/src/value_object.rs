//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are immutable and compared by their attribute values. In the
/// storefront these are things like a `Price` (amount + currency) or a
/// `CatalogFilter`: two filters selecting the same tags, search text and page
/// are the same filter, wherever they came from.
///
/// ```ignore
/// #[derive(Debug, Clone, PartialEq, Eq)]
/// struct Price {
///     amount_cents: i64,
///     currency: String,
/// }
///
/// impl ValueObject for Price {}
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
