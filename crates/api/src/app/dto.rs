use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_catalog::{
    CatalogPage, Facet, NewProduct, Product, ProductDetail, ProductStatus, ProductSummary,
};
use storefront_core::{ProductId, TagId};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct AssetUploadQuery {
    pub bucket: Option<String>,
    pub path: Option<String>,
}

/// Tag ids keyed by the slug of the group they were picked from.
pub type TagSelection = BTreeMap<String, Vec<TagId>>;

/// Flatten a per-group selection into the tag ids to attach.
pub fn selected_tag_ids(selection: &TagSelection) -> Vec<TagId> {
    selection.values().flatten().copied().collect()
}

/// Body of `POST /admin/products`: the product fields plus its tags.
#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    #[serde(flatten)]
    pub product: NewProduct,
    #[serde(default)]
    pub tags: TagSelection,
}

#[derive(Debug, Deserialize)]
pub struct ProductTagsRequest {
    pub tags: TagSelection,
}

#[derive(Debug, Deserialize)]
pub struct FileDownloadQuery {
    pub path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SignedObjectQuery {
    pub expires: i64,
    pub signature: String,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct CatalogResponse {
    pub products: Vec<ProductSummary>,
    pub count: u64,
}

impl From<CatalogPage> for CatalogResponse {
    fn from(page: CatalogPage) -> Self {
        Self {
            products: page.items,
            count: page.total_count,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FacetsResponse {
    pub groups: Vec<Facet>,
}

#[derive(Debug, Serialize)]
pub struct ProductDetailResponse {
    pub product: ProductDetail,
}

#[derive(Debug, Serialize)]
pub struct DownloadUrlResponse {
    pub url: String,
}

/// Row of the admin product table.
#[derive(Debug, Serialize)]
pub struct AdminProductRow {
    pub id: ProductId,
    pub title: String,
    pub slug: String,
    pub price_cents: i64,
    pub currency: String,
    pub status: ProductStatus,
    pub is_active: bool,
    pub cover_image_path: Option<String>,
    pub pdf_path: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Product> for AdminProductRow {
    fn from(p: Product) -> Self {
        Self {
            id: p.id,
            title: p.title,
            slug: p.slug,
            price_cents: p.price.amount_cents,
            currency: p.price.currency,
            status: p.status,
            is_active: p.is_active,
            cover_image_path: p.cover_image_path,
            pdf_path: p.pdf_path,
            created_at: p.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AdminProductsResponse {
    pub products: Vec<AdminProductRow>,
}

#[derive(Debug, Serialize)]
pub struct AdminProductResponse {
    pub product: Product,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warnings: Option<Vec<String>>,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            warnings: None,
        }
    }

    pub fn with_warnings(warnings: Vec<String>) -> Self {
        Self {
            success: true,
            warnings: (!warnings.is_empty()).then_some(warnings),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn warnings_are_omitted_when_empty() {
        let body = serde_json::to_value(SuccessResponse::with_warnings(vec![])).unwrap();
        assert_eq!(body, json!({ "success": true }));

        let body =
            serde_json::to_value(SuccessResponse::with_warnings(vec!["PDF delete failed".into()]))
                .unwrap();
        assert_eq!(body["warnings"], json!(["PDF delete failed"]));
    }

    #[test]
    fn create_request_reads_product_fields_and_grouped_tags() {
        let math = TagId::new();
        let grade4 = TagId::new();
        let body = json!({
            "title": "Fractions",
            "slug": "fractions",
            "price_cents": 1000,
            "tags": { "subject": [math], "grade-level": [grade4] }
        });

        let req: CreateProductRequest = serde_json::from_value(body).unwrap();
        assert_eq!(req.product.title, "Fractions");
        assert_eq!(req.product.status, ProductStatus::Draft);

        let mut ids = selected_tag_ids(&req.tags);
        ids.sort();
        let mut expected = vec![math, grade4];
        expected.sort();
        assert_eq!(ids, expected);

        let bare: CreateProductRequest =
            serde_json::from_value(json!({ "title": "T", "slug": "t", "price_cents": 0 })).unwrap();
        assert!(bare.tags.is_empty());
    }

    #[test]
    fn catalog_response_uses_products_and_count() {
        let body = serde_json::to_value(CatalogResponse::from(CatalogPage::empty())).unwrap();
        assert_eq!(body, json!({ "products": [], "count": 0 }));
    }
}
