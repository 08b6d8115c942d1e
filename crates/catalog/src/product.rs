use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use storefront_core::{DomainError, DomainResult, ProductId, ValueObject};

/// Product status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    Draft,
    Published,
    Archived,
}

impl ProductStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ProductStatus::Draft => "draft",
            ProductStatus::Published => "published",
            ProductStatus::Archived => "archived",
        }
    }
}

impl core::fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "draft" => Ok(ProductStatus::Draft),
            "published" => Ok(ProductStatus::Published),
            "archived" => Ok(ProductStatus::Archived),
            other => Err(DomainError::validation(format!(
                "status must be one of: draft, published, archived (got '{other}')"
            ))),
        }
    }
}

/// Price in the smallest currency unit (e.g. cents) plus an ISO currency code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    #[serde(rename = "price_cents")]
    pub amount_cents: i64,
    pub currency: String,
}

impl Price {
    pub fn new(amount_cents: i64, currency: impl AsRef<str>) -> DomainResult<Self> {
        if amount_cents < 0 {
            return Err(DomainError::validation("price_cents must not be negative"));
        }
        Ok(Self {
            amount_cents,
            currency: normalize_currency(currency.as_ref())?,
        })
    }
}

impl ValueObject for Price {}

fn normalize_currency(raw: &str) -> DomainResult<String> {
    let code = raw.trim();
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(DomainError::validation(
            "currency must be a 3-letter ISO code (e.g. USD)",
        ));
    }
    Ok(code.to_ascii_uppercase())
}

/// Visibility gate: only products matching both `status` and `is_active` are
/// ever returned by a catalog query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Visibility {
    pub status: ProductStatus,
    pub is_active: bool,
}

impl Visibility {
    /// What the public storefront shows.
    pub const PUBLIC: Visibility = Visibility {
        status: ProductStatus::Published,
        is_active: true,
    };

    pub fn admits(&self, product: &Product) -> bool {
        product.status == self.status && product.is_active == self.is_active
    }
}

impl Default for Visibility {
    fn default() -> Self {
        Self::PUBLIC
    }
}

/// A catalog product (full record, as stored).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    #[serde(flatten)]
    pub price: Price,
    pub status: ProductStatus,
    pub is_active: bool,
    pub cover_image_path: Option<String>,
    pub pdf_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Field projection returned by catalog listings.
    pub fn summary(&self) -> ProductSummary {
        ProductSummary {
            id: self.id,
            title: self.title.clone(),
            slug: self.slug.clone(),
            cover_image_path: self.cover_image_path.clone(),
            pdf_path: self.pdf_path.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            price_cents: self.price.amount_cents,
            currency: self.price.currency.clone(),
        }
    }

    /// Field projection returned by the public product page.
    pub fn detail(&self) -> ProductDetail {
        ProductDetail {
            id: self.id,
            title: self.title.clone(),
            slug: self.slug.clone(),
            cover_image_path: self.cover_image_path.clone(),
            pdf_path: self.pdf_path.clone(),
            created_at: self.created_at,
            price_cents: self.price.amount_cents,
            currency: self.price.currency.clone(),
            description: self.description.clone(),
        }
    }

    pub fn assets(&self) -> ProductAssets {
        ProductAssets {
            cover_image_path: self.cover_image_path.clone(),
            pdf_path: self.pdf_path.clone(),
        }
    }

    /// Apply an admin patch. The patch is validated before any field is
    /// touched, so a rejected patch leaves the product unchanged.
    pub fn apply_patch(&mut self, patch: &ProductPatch, now: DateTime<Utc>) -> DomainResult<()> {
        patch.validate()?;

        if let Some(title) = &patch.title {
            self.title = title.trim().to_string();
        }
        if let Some(slug) = &patch.slug {
            self.slug = slug.trim().to_string();
        }
        if let Some(description) = &patch.description {
            self.description = description.clone();
        }
        if let Some(cents) = patch.price_cents {
            self.price.amount_cents = cents;
        }
        if let Some(currency) = &patch.currency {
            self.price.currency = normalize_currency(currency)?;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(is_active) = patch.is_active {
            self.is_active = is_active;
        }
        if let Some(cover) = &patch.cover_image_path {
            self.cover_image_path = cover.clone();
        }
        if let Some(pdf) = &patch.pdf_path {
            self.pdf_path = pdf.clone();
        }
        self.updated_at = now;
        Ok(())
    }
}

fn validate_title(raw: &str) -> DomainResult<String> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(DomainError::validation("title must not be empty"));
    }
    Ok(title.to_string())
}

/// Slugs are URL keys: lowercase ASCII letters, digits and single hyphens.
pub fn validate_slug(raw: &str) -> DomainResult<String> {
    let slug = raw.trim();
    let well_formed = !slug.is_empty()
        && !slug.starts_with('-')
        && !slug.ends_with('-')
        && !slug.contains("--")
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if !well_formed {
        return Err(DomainError::validation(format!(
            "slug '{slug}' must contain only lowercase letters, digits and single hyphens"
        )));
    }
    Ok(slug.to_string())
}

/// Product fields returned by catalog listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSummary {
    pub id: ProductId,
    pub title: String,
    pub slug: String,
    pub cover_image_path: Option<String>,
    pub pdf_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub price_cents: i64,
    pub currency: String,
}

/// Product fields exposed on the public product page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDetail {
    pub id: ProductId,
    pub title: String,
    pub slug: String,
    pub cover_image_path: Option<String>,
    pub pdf_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub price_cents: i64,
    pub currency: String,
    pub description: Option<String>,
}

/// Object-store paths owned by a product (cleaned up on delete).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductAssets {
    pub cover_image_path: Option<String>,
    pub pdf_path: Option<String>,
}

/// Partial admin update.
///
/// Nullable columns use `Option<Option<_>>`: absent means "leave as is",
/// `null` means "clear".
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProductPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub price_cents: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub status: Option<ProductStatus>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default, deserialize_with = "present")]
    pub cover_image_path: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub pdf_path: Option<Option<String>>,
}

impl ProductPatch {
    /// Check every present field without applying anything.
    pub fn validate(&self) -> DomainResult<()> {
        if let Some(title) = &self.title {
            validate_title(title)?;
        }
        if let Some(slug) = &self.slug {
            validate_slug(slug)?;
        }
        if self.price_cents.is_some_and(|cents| cents < 0) {
            return Err(DomainError::validation("price_cents must not be negative"));
        }
        if let Some(currency) = &self.currency {
            normalize_currency(currency)?;
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.slug.is_none()
            && self.description.is_none()
            && self.price_cents.is_none()
            && self.currency.is_none()
            && self.status.is_none()
            && self.is_active.is_none()
            && self.cover_image_path.is_none()
            && self.pdf_path.is_none()
    }
}

/// Admin create request.
///
/// Omitted fields take the back-office form's defaults: a draft, active,
/// USD-priced product with no assets.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewProduct {
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price_cents: i64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_status")]
    pub status: ProductStatus,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub cover_image_path: Option<String>,
    #[serde(default)]
    pub pdf_path: Option<String>,
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_status() -> ProductStatus {
    ProductStatus::Draft
}

fn default_active() -> bool {
    true
}

impl NewProduct {
    /// Validate every field and build the record to store. A blank
    /// description is stored as `None`.
    pub fn into_product(self, id: ProductId, now: DateTime<Utc>) -> DomainResult<Product> {
        let title = validate_title(&self.title)?;
        let slug = validate_slug(&self.slug)?;
        let price = Price::new(self.price_cents, &self.currency)?;
        let description = self
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());

        Ok(Product {
            id,
            title,
            slug,
            description,
            price,
            status: self.status,
            is_active: self.is_active,
            cover_image_path: self.cover_image_path,
            pdf_path: self.pdf_path,
            created_at: now,
            updated_at: now,
        })
    }
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn test_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    fn sample_product() -> Product {
        Product {
            id: ProductId::from_uuid(uuid::Uuid::from_u128(1)),
            title: "Grade 4 Math".to_string(),
            slug: "grade-4-math".to_string(),
            description: Some("Fractions practice".to_string()),
            price: Price::new(499, "usd").unwrap(),
            status: ProductStatus::Published,
            is_active: true,
            cover_image_path: Some("covers/g4.png".to_string()),
            pdf_path: Some("files/g4.pdf".to_string()),
            created_at: test_time(),
            updated_at: test_time(),
        }
    }

    #[test]
    fn status_parses_case_insensitively_and_rejects_unknown() {
        assert_eq!("Published".parse::<ProductStatus>().unwrap(), ProductStatus::Published);
        assert_eq!(" draft ".parse::<ProductStatus>().unwrap(), ProductStatus::Draft);
        assert!("live".parse::<ProductStatus>().is_err());
    }

    #[test]
    fn price_normalizes_currency_and_rejects_negative() {
        assert_eq!(Price::new(100, "eur").unwrap().currency, "EUR");
        assert!(Price::new(-1, "USD").is_err());
        assert!(Price::new(100, "US").is_err());
    }

    #[test]
    fn visibility_requires_status_and_active_flag() {
        let mut product = sample_product();
        assert!(Visibility::PUBLIC.admits(&product));

        product.is_active = false;
        assert!(!Visibility::PUBLIC.admits(&product));

        product.is_active = true;
        product.status = ProductStatus::Draft;
        assert!(!Visibility::PUBLIC.admits(&product));
        assert!(Visibility { status: ProductStatus::Draft, is_active: true }.admits(&product));
    }

    #[test]
    fn serializes_price_flat_like_the_products_table() {
        let json = serde_json::to_value(sample_product()).unwrap();
        assert_eq!(json["price_cents"], 499);
        assert_eq!(json["currency"], "USD");
        assert_eq!(json["status"], "published");
        assert!(json.get("price").is_none());
    }

    #[test]
    fn patch_distinguishes_absent_from_null() {
        let patch: ProductPatch =
            serde_json::from_str(r#"{"description": null, "title": "New"}"#).unwrap();
        assert_eq!(patch.description, Some(None));
        assert_eq!(patch.pdf_path, None);
        assert!(!patch.is_empty());

        let empty: ProductPatch = serde_json::from_str("{}").unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn apply_patch_updates_only_present_fields() {
        let mut product = sample_product();
        let later = test_time() + chrono::Duration::hours(1);
        let patch = ProductPatch {
            title: Some("  Grade 4 Math Bundle ".to_string()),
            description: Some(None),
            status: Some(ProductStatus::Archived),
            ..ProductPatch::default()
        };

        product.apply_patch(&patch, later).unwrap();

        assert_eq!(product.title, "Grade 4 Math Bundle");
        assert_eq!(product.description, None);
        assert_eq!(product.status, ProductStatus::Archived);
        assert_eq!(product.slug, "grade-4-math");
        assert_eq!(product.pdf_path.as_deref(), Some("files/g4.pdf"));
        assert_eq!(product.updated_at, later);
    }

    #[test]
    fn rejected_patch_leaves_product_untouched() {
        let mut product = sample_product();
        let before = product.clone();
        let patch = ProductPatch {
            title: Some("Renamed".to_string()),
            slug: Some("Not A Slug".to_string()),
            ..ProductPatch::default()
        };

        assert!(matches!(
            product.apply_patch(&patch, test_time()),
            Err(DomainError::Validation(_))
        ));
        assert_eq!(product, before);
    }

    #[test]
    fn slug_validation() {
        assert!(validate_slug("grade-4-math").is_ok());
        assert!(validate_slug("-lead").is_err());
        assert!(validate_slug("double--hyphen").is_err());
        assert!(validate_slug("Upper").is_err());
        assert!(validate_slug("").is_err());
    }

    #[test]
    fn new_product_defaults_follow_the_admin_form() {
        let new: NewProduct =
            serde_json::from_str(r#"{"title": " Maps ", "slug": "maps", "price_cents": 1000, "description": "  "}"#)
                .unwrap();
        let id = ProductId::from_uuid(uuid::Uuid::from_u128(7));

        let product = new.into_product(id, test_time()).unwrap();

        assert_eq!(product.title, "Maps");
        assert_eq!(product.description, None);
        assert_eq!(product.status, ProductStatus::Draft);
        assert!(product.is_active);
        assert_eq!(product.price, Price::new(1000, "USD").unwrap());
        assert_eq!(product.created_at, product.updated_at);
    }

    #[test]
    fn new_product_rejects_bad_fields() {
        let base = NewProduct {
            title: "Maps".to_string(),
            slug: "maps".to_string(),
            description: None,
            price_cents: 100,
            currency: "USD".to_string(),
            status: ProductStatus::Published,
            is_active: true,
            cover_image_path: None,
            pdf_path: None,
        };
        let id = ProductId::new();

        for bad in [
            NewProduct { title: "  ".to_string(), ..base.clone() },
            NewProduct { slug: "Maps Pack".to_string(), ..base.clone() },
            NewProduct { price_cents: -5, ..base.clone() },
            NewProduct { currency: "dollars".to_string(), ..base.clone() },
        ] {
            assert!(matches!(bad.into_product(id, test_time()), Err(DomainError::Validation(_))));
        }
        assert!(base.into_product(id, test_time()).is_ok());
    }
}
