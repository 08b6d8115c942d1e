//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store/object-store wiring and the catalog query engine
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response DTOs
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{extract::DefaultBodyLimit, Extension, Router};
use tower::ServiceBuilder;

use storefront_auth::Hs256JwtValidator;

use crate::config::AppConfig;
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::AppServices;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(config: &AppConfig, services: AppServices) -> Router {
    let jwt = Arc::new(Hs256JwtValidator::new(config.jwt_secret.clone().into_bytes()));
    let auth_state = middleware::AuthState { jwt };

    // Admin routes: auth (outer) then role guard (inner).
    let admin = routes::admin::router().layer(
        ServiceBuilder::new()
            .layer(axum::middleware::from_fn(middleware::require_admin))
            .layer(DefaultBodyLimit::max(config.max_upload_bytes)),
    );

    let protected = routes::authenticated_router()
        .nest("/admin", admin)
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    Router::new()
        .merge(routes::public_router())
        .merge(protected)
        .layer(Extension(Arc::new(services)))
}
