//! Infrastructure wiring shared by all handlers.

use std::sync::Arc;

use anyhow::Context;
use chrono::Duration;
use sqlx::postgres::PgPoolOptions;

use storefront_infra::{
    CatalogQueryEngine, CatalogStore, InMemoryCatalogStore, InMemoryObjectStore, ObjectStore,
    PostgresCatalogStore, ProductAdminStore, UrlSigner,
};

use crate::config::AppConfig;

/// Signed download links never outlive a week, whatever the configuration says.
const MAX_DOWNLOAD_TTL_SECS: u64 = 7 * 24 * 3600;

pub type SharedCatalogStore = Arc<dyn CatalogStore>;

pub struct AppServices {
    pub catalog: SharedCatalogStore,
    pub admin: Arc<dyn ProductAdminStore>,
    pub objects: Arc<dyn ObjectStore>,
    pub signer: UrlSigner,
    pub engine: CatalogQueryEngine<SharedCatalogStore>,
    pub download_ttl: Duration,
    pub max_page_size: u32,
}

impl AppServices {
    /// Wire services over one store that serves both the catalog and the
    /// admin write path.
    pub fn new<S>(store: Arc<S>, objects: Arc<dyn ObjectStore>, config: &AppConfig) -> Self
    where
        S: CatalogStore + ProductAdminStore + 'static,
    {
        let catalog: SharedCatalogStore = store.clone();
        Self {
            engine: CatalogQueryEngine::new(catalog.clone()),
            catalog,
            admin: store,
            objects,
            signer: signer_from(config),
            download_ttl: Duration::seconds(config.download_url_ttl_secs.min(MAX_DOWNLOAD_TTL_SECS) as i64),
            max_page_size: config.catalog_max_page_size,
        }
    }
}

pub fn signer_from(config: &AppConfig) -> UrlSigner {
    UrlSigner::new(
        config.object_signing_key.as_bytes().to_vec(),
        config.object_base_url.clone(),
    )
}

/// Build services for the running process: Postgres when `DATABASE_URL` is
/// set, otherwise the in-memory store.
pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    let objects: Arc<dyn ObjectStore> = Arc::new(InMemoryObjectStore::new(signer_from(config)));

    match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(url)
                .await
                .context("failed to connect to Postgres")?;
            let store = PostgresCatalogStore::new(pool);
            store
                .ensure_schema()
                .await
                .context("failed to bootstrap catalog schema")?;
            tracing::info!("catalog store: postgres");
            Ok(AppServices::new(Arc::new(store), objects, config))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory catalog store");
            Ok(AppServices::new(Arc::new(InMemoryCatalogStore::new()), objects, config))
        }
    }
}
