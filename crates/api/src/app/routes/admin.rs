//! Back-office routes for catalog management.
//!
//! Mounted under `/admin` behind both the auth middleware and the admin
//! guard, so every handler here can assume an authorized principal.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Extension, Path, Query},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};

use chrono::Utc;

use storefront_catalog::ProductPatch;
use storefront_core::ProductId;
use storefront_infra::object_store::{PRODUCT_COVERS_BUCKET, PRODUCT_FILES_BUCKET};
use storefront_infra::ProductKey;

use crate::app::{dto, errors, services::AppServices};
use crate::context::PrincipalContext;

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

pub fn router() -> Router {
    Router::new()
        .route("/products", get(list_products).post(create_product))
        .route(
            "/products/:id",
            get(get_product).patch(update_product).delete(delete_product),
        )
        .route("/products/:id/tags", put(set_product_tags))
        .route("/assets", put(upload_asset))
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// GET /admin/products - All products, any status, newest first
pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.admin.list_products().await {
        Ok(products) => {
            let products = products.into_iter().map(dto::AdminProductRow::from).collect();
            (StatusCode::OK, Json(dto::AdminProductsResponse { products })).into_response()
        }
        Err(e) => errors::store_error_to_response("list_products", e),
    }
}

/// POST /admin/products - Create a product and attach the selected tags
pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(req): Json<dto::CreateProductRequest>,
) -> axum::response::Response {
    let product = match req.product.into_product(ProductId::new(), Utc::now()) {
        Ok(product) => product,
        Err(e) => return errors::domain_error_to_response(e),
    };
    let tags = dto::selected_tag_ids(&req.tags);

    match services.admin.create_product(product, &tags).await {
        Ok(product) => {
            tracing::info!(
                product_id = %product.id,
                user_id = %principal.user_id(),
                tag_count = tags.len(),
                "product created"
            );
            (StatusCode::CREATED, Json(dto::AdminProductResponse { product })).into_response()
        }
        Err(e) => errors::store_error_to_response("create_product", e),
    }
}

/// PUT /admin/products/:id/tags - Replace the product's tag assignments
pub async fn set_product_tags(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(req): Json<dto::ProductTagsRequest>,
) -> axum::response::Response {
    let id = match parse_product_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let tags = dto::selected_tag_ids(&req.tags);

    match services.admin.set_product_tags(id, &tags).await {
        Ok(true) => {
            tracing::info!(product_id = %id, user_id = %principal.user_id(), "product tags replaced");
            (StatusCode::OK, Json(dto::SuccessResponse::ok())).into_response()
        }
        Ok(false) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "Not found"),
        Err(e) => errors::store_error_to_response("set_product_tags", e),
    }
}

/// GET /admin/products/:id
pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_product_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.catalog.find_product(&ProductKey::Id(id)).await {
        Ok(Some(product)) => (StatusCode::OK, Json(dto::AdminProductResponse { product })).into_response(),
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "Product not found"),
        Err(e) => errors::store_error_to_response("find_product", e),
    }
}

/// PATCH /admin/products/:id - Partial update
pub async fn update_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(patch): Json<ProductPatch>,
) -> axum::response::Response {
    let id = match parse_product_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    if patch.is_empty() {
        return errors::json_error(StatusCode::BAD_REQUEST, "validation_error", "No updates provided");
    }
    if let Err(e) = patch.validate() {
        return errors::domain_error_to_response(e);
    }

    match services.admin.update_product(id, &patch).await {
        Ok(Some(product)) => {
            tracing::info!(product_id = %id, user_id = %principal.user_id(), "product updated");
            (StatusCode::OK, Json(dto::AdminProductResponse { product })).into_response()
        }
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "Not found"),
        Err(e) => errors::store_error_to_response("update_product", e),
    }
}

/// DELETE /admin/products/:id - Remove tags, the product, then its stored assets
pub async fn delete_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_product_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let assets = match services.admin.delete_product(id).await {
        Ok(Some(assets)) => assets,
        Ok(None) => return errors::json_error(StatusCode::NOT_FOUND, "not_found", "Not found"),
        Err(e) => return errors::store_error_to_response("delete_product", e),
    };
    tracing::info!(product_id = %id, user_id = %principal.user_id(), "product deleted");

    // The row is gone at this point; asset cleanup is best effort.
    let mut warnings = Vec::new();
    if let Some(cover) = &assets.cover_image_path {
        if let Err(e) = services.objects.remove(PRODUCT_COVERS_BUCKET, cover).await {
            tracing::warn!(product_id = %id, path = %cover, error = %e, "cover cleanup failed");
            warnings.push(format!("Cover delete failed: {e}"));
        }
    }
    if let Some(pdf) = &assets.pdf_path {
        if let Err(e) = services.objects.remove(PRODUCT_FILES_BUCKET, pdf).await {
            tracing::warn!(product_id = %id, path = %pdf, error = %e, "pdf cleanup failed");
            warnings.push(format!("PDF delete failed: {e}"));
        }
    }

    (StatusCode::OK, Json(dto::SuccessResponse::with_warnings(warnings))).into_response()
}

/// PUT /admin/assets?bucket=&path= - Upload (upsert) raw body bytes
pub async fn upload_asset(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::AssetUploadQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> axum::response::Response {
    let (Some(bucket), Some(path)) = (query.bucket, query.path) else {
        return errors::json_error(StatusCode::BAD_REQUEST, "validation_error", "Missing file or path");
    };
    if body.is_empty() {
        return errors::json_error(StatusCode::BAD_REQUEST, "validation_error", "Missing file or path");
    }
    if bucket != PRODUCT_FILES_BUCKET && bucket != PRODUCT_COVERS_BUCKET {
        return errors::json_error(
            StatusCode::BAD_REQUEST,
            "invalid_bucket",
            format!("bucket must be one of: {PRODUCT_FILES_BUCKET}, {PRODUCT_COVERS_BUCKET}"),
        );
    }

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream");

    match services.objects.upload(&bucket, &path, body.to_vec(), content_type).await {
        Ok(()) => (StatusCode::OK, Json(dto::SuccessResponse::ok())).into_response(),
        Err(e) => errors::object_error_to_response(e),
    }
}

fn parse_product_id(raw: &str) -> Result<ProductId, axum::response::Response> {
    raw.parse::<ProductId>()
        .map_err(|_| errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "Missing product id"))
}
