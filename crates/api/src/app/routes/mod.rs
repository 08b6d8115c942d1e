use axum::{routing::get, Router};

pub mod admin;
pub mod objects;
pub mod products;
pub mod system;

/// Endpoints anyone can call.
pub fn public_router() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .route("/products", get(products::list_catalog))
        .route("/products/facets", get(products::facets))
        .route("/product/:key", get(products::product_detail))
        .route("/objects/:bucket/*path", get(objects::signed_object))
}

/// Endpoints that need a verified bearer token (admin routes are nested in
/// by the caller, behind their own guard).
pub fn authenticated_router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .route("/products/:id/download", get(products::download_url))
        .route("/download", get(products::download_file))
}
