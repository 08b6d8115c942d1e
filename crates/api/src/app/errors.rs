use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use storefront_core::DomainError;
use storefront_infra::{CatalogQueryError, ObjectStoreError, StoreError};

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// Catalog listing failures keep the bare `{ "error": <message> }` shape
/// storefront clients already parse.
pub fn catalog_error_to_response(err: CatalogQueryError) -> axum::response::Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        axum::Json(json!({ "error": err.to_string() })),
    )
        .into_response()
}

pub fn store_error_to_response(operation: &'static str, err: StoreError) -> axum::response::Response {
    tracing::warn!(operation, error = %err, "store call failed");
    match err {
        StoreError::Unavailable(msg) => {
            json_error(StatusCode::SERVICE_UNAVAILABLE, "store_unavailable", msg)
        }
        StoreError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        StoreError::Query(msg) => json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", msg),
    }
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        DomainError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
    }
}

pub fn object_error_to_response(err: ObjectStoreError) -> axum::response::Response {
    match err {
        ObjectStoreError::NotFound { .. } => {
            json_error(StatusCode::NOT_FOUND, "not_found", err.to_string())
        }
        ObjectStoreError::InvalidPath(_) => {
            json_error(StatusCode::BAD_REQUEST, "invalid_path", err.to_string())
        }
        ObjectStoreError::Unavailable(_) => {
            tracing::warn!(error = %err, "object store call failed");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "object_store_error", err.to_string())
        }
    }
}
