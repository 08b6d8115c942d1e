//! Storefront product routes.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Utc;

use storefront_auth::Permission;
use storefront_catalog::{build_facets, CatalogFilter, PageRequest, Visibility};
use storefront_core::{DomainResult, ProductId};
use storefront_infra::object_store::{normalize_path, PRODUCT_FILES_BUCKET};
use storefront_infra::ProductKey;

use crate::app::{dto, errors, services::AppServices};
use crate::authz::authorize_request;
use crate::context::PrincipalContext;

/// GET /products - Catalog query
///
/// Query parameters are decoded by [`CatalogFilter::from_query_pairs`];
/// repeated keys are passed through in order.
pub async fn list_catalog(
    Extension(services): Extension<Arc<AppServices>>,
    Query(params): Query<Vec<(String, String)>>,
) -> axum::response::Response {
    let filter = match CatalogFilter::from_query_pairs(params)
        .and_then(|f| clamp_page_size(f, services.max_page_size))
    {
        Ok(f) => f,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.engine.query(&filter).await {
        Ok(page) => (StatusCode::OK, Json(dto::CatalogResponse::from(page))).into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

fn clamp_page_size(filter: CatalogFilter, max: u32) -> DomainResult<CatalogFilter> {
    let page = filter.page();
    if page.page_size() <= max {
        return Ok(filter);
    }
    Ok(filter.with_page(PageRequest::new(page.page(), max)?))
}

/// GET /products/facets - Recognized tag groups with their tags
pub async fn facets(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    let groups = match services.catalog.tag_groups().await {
        Ok(g) => g,
        Err(e) => return errors::store_error_to_response("tag_groups", e),
    };
    let tags = match services.catalog.tags().await {
        Ok(t) => t,
        Err(e) => return errors::store_error_to_response("tags", e),
    };

    let groups = build_facets(groups, tags);
    (StatusCode::OK, Json(dto::FacetsResponse { groups })).into_response()
}

/// GET /product/:key - Public product page data, by id or slug
pub async fn product_detail(
    Extension(services): Extension<Arc<AppServices>>,
    Path(key): Path<String>,
) -> axum::response::Response {
    let Some(key) = ProductKey::parse(&key) else {
        return errors::json_error(StatusCode::BAD_REQUEST, "missing_id", "product id or slug is required");
    };

    match services.catalog.find_product(&key).await {
        // Hidden products look exactly like missing ones.
        Ok(Some(product)) if Visibility::PUBLIC.admits(&product) => (
            StatusCode::OK,
            Json(dto::ProductDetailResponse {
                product: product.detail(),
            }),
        )
            .into_response(),
        Ok(_) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "product not found"),
        Err(e) => errors::store_error_to_response("find_product", e),
    }
}

/// GET /products/:id/download - Short-lived signed URL for the product PDF
pub async fn download_url(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(e) = authorize_request(&principal, &[Permission::DOWNLOADS_READ]) {
        return errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string());
    }

    let id: ProductId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid product id"),
    };

    let pdf_path = match services.catalog.find_product(&ProductKey::Id(id)).await {
        Ok(product) => product.and_then(|p| p.pdf_path),
        Err(e) => return errors::store_error_to_response("find_product", e),
    };
    let Some(pdf_path) = pdf_path else {
        return errors::json_error(StatusCode::NOT_FOUND, "not_found", "No PDF available");
    };

    match services
        .objects
        .signed_url(PRODUCT_FILES_BUCKET, &pdf_path, services.download_ttl, Utc::now())
        .await
    {
        Ok(signed) => {
            tracing::info!(product_id = %id, user_id = %principal.user_id(), "download url issued");
            (StatusCode::OK, Json(dto::DownloadUrlResponse { url: signed.url })).into_response()
        }
        Err(e) => errors::object_error_to_response(e),
    }
}

/// GET /download?path= - Stream a product file as an attachment
pub async fn download_file(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<dto::FileDownloadQuery>,
) -> axum::response::Response {
    if let Err(e) = authorize_request(&principal, &[Permission::DOWNLOADS_READ]) {
        return errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string());
    }

    let Some(raw) = query.path.filter(|p| !p.trim().is_empty()) else {
        return errors::json_error(StatusCode::BAD_REQUEST, "validation_error", "Missing path");
    };
    let path = match normalize_path(&raw) {
        Ok(p) => p,
        Err(e) => return errors::object_error_to_response(e),
    };

    let object = match services.objects.download(PRODUCT_FILES_BUCKET, &path).await {
        Ok(o) => o,
        Err(e) => {
            tracing::warn!(path = %path, error = %e, "file download failed");
            return errors::json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "download_failed",
                "Failed to download file",
            );
        }
    };

    let file_name = path.rsplit('/').next().filter(|s| !s.is_empty()).unwrap_or("download.pdf");
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        object.bytes,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_size_is_clamped_but_page_kept() {
        let filter = CatalogFilter::new().with_page(PageRequest::new(3, 500).unwrap());
        let clamped = clamp_page_size(filter, 100).unwrap();
        assert_eq!(clamped.page().page(), 3);
        assert_eq!(clamped.page().page_size(), 100);

        let small = CatalogFilter::new().with_page(PageRequest::new(1, 10).unwrap());
        assert_eq!(clamp_page_size(small.clone(), 100).unwrap(), small);
    }
}
