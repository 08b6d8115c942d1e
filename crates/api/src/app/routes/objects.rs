//! Signed object reads.
//!
//! Serves the URLs produced by the object store's signer; the signature and
//! expiry in the query string are the only credentials.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::{header, StatusCode},
    response::IntoResponse,
};
use chrono::Utc;

use storefront_infra::object_store::normalize_path;

use crate::app::{dto, errors, services::AppServices};

/// GET /objects/:bucket/*path?expires=&signature=
pub async fn signed_object(
    Extension(services): Extension<Arc<AppServices>>,
    Path((bucket, path)): Path<(String, String)>,
    Query(query): Query<dto::SignedObjectQuery>,
) -> axum::response::Response {
    let path = match normalize_path(&path) {
        Ok(p) => p,
        Err(e) => return errors::object_error_to_response(e),
    };

    if !services
        .signer
        .verify(&bucket, &path, query.expires, &query.signature, Utc::now())
    {
        return errors::json_error(StatusCode::FORBIDDEN, "invalid_signature", "signature invalid or expired");
    }

    match services.objects.download(&bucket, &path).await {
        Ok(object) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, object.content_type)],
            object.bytes,
        )
            .into_response(),
        Err(e) => errors::object_error_to_response(e),
    }
}
