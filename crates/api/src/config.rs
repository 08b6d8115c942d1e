//! Process configuration, read from the environment at startup.

use std::net::SocketAddr;

use anyhow::Context;
use thiserror::Error;

const DEV_JWT_SECRET: &str = "dev-secret";
const DEV_SIGNING_KEY: &str = "dev-object-signing-key";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} is not a valid {expected}: '{value}'")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}

#[derive(Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    /// `None` runs against the in-memory catalog store.
    pub database_url: Option<String>,
    pub object_signing_key: String,
    pub object_base_url: String,
    pub download_url_ttl_secs: u64,
    /// Upper bound applied to `pageSize` on the public catalog endpoint.
    pub catalog_max_page_size: u32,
    pub max_upload_bytes: usize,
}

impl core::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AppConfig")
            .field("bind_addr", &self.bind_addr)
            .field("database_url", &self.database_url.as_ref().map(|_| "<set>"))
            .field("object_base_url", &self.object_base_url)
            .field("download_url_ttl_secs", &self.download_url_ttl_secs)
            .field("catalog_max_page_size", &self.catalog_max_page_size)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .finish_non_exhaustive()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            jwt_secret: DEV_JWT_SECRET.to_string(),
            database_url: None,
            object_signing_key: DEV_SIGNING_KEY.to_string(),
            object_base_url: "http://localhost:8080/objects".to_string(),
            download_url_ttl_secs: 60,
            catalog_max_page_size: 100,
            max_upload_bytes: 25 * 1024 * 1024,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
            .context("failed to load configuration from environment")
    }

    /// Build from an arbitrary variable source. Unset or blank variables
    /// keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();

        if let Some(v) = get("BIND_ADDR") {
            config.bind_addr = parse("BIND_ADDR", "socket address", &v)?;
        }

        match get("JWT_SECRET") {
            Some(v) => config.jwt_secret = v,
            None => tracing::warn!("JWT_SECRET not set; using insecure dev default"),
        }

        config.database_url = get("DATABASE_URL");

        match get("OBJECT_SIGNING_KEY") {
            Some(v) => config.object_signing_key = v,
            None => tracing::warn!("OBJECT_SIGNING_KEY not set; using insecure dev default"),
        }

        if let Some(v) = get("OBJECT_BASE_URL") {
            config.object_base_url = v;
        }
        if let Some(v) = get("DOWNLOAD_URL_TTL_SECS") {
            config.download_url_ttl_secs = parse("DOWNLOAD_URL_TTL_SECS", "number of seconds", &v)?;
        }
        if let Some(v) = get("CATALOG_MAX_PAGE_SIZE") {
            let max: u32 = parse("CATALOG_MAX_PAGE_SIZE", "positive integer", &v)?;
            if max == 0 {
                return Err(ConfigError::Invalid {
                    name: "CATALOG_MAX_PAGE_SIZE",
                    expected: "positive integer",
                    value: v,
                });
            }
            config.catalog_max_page_size = max;
        }
        if let Some(v) = get("MAX_UPLOAD_BYTES") {
            config.max_upload_bytes = parse("MAX_UPLOAD_BYTES", "byte count", &v)?;
        }

        Ok(config)
    }
}

fn parse<T: core::str::FromStr>(
    name: &'static str,
    expected: &'static str,
    value: &str,
) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::Invalid {
        name,
        expected,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.database_url, None);
        assert_eq!(config.download_url_ttl_secs, 60);
        assert_eq!(config.catalog_max_page_size, 100);
    }

    #[test]
    fn values_override_defaults() {
        let config = AppConfig::from_lookup(lookup(&[
            ("BIND_ADDR", "127.0.0.1:9000"),
            ("DATABASE_URL", "postgres://localhost/shop"),
            ("DOWNLOAD_URL_TTL_SECS", "120"),
            ("CATALOG_MAX_PAGE_SIZE", " 50 "),
            ("OBJECT_BASE_URL", "https://cdn.example.com/o"),
        ]))
        .unwrap();

        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:9000");
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/shop"));
        assert_eq!(config.download_url_ttl_secs, 120);
        assert_eq!(config.catalog_max_page_size, 50);
        assert_eq!(config.object_base_url, "https://cdn.example.com/o");
    }

    #[test]
    fn malformed_numbers_are_errors() {
        let err = AppConfig::from_lookup(lookup(&[("DOWNLOAD_URL_TTL_SECS", "soon")])).unwrap_err();
        assert!(err.to_string().contains("DOWNLOAD_URL_TTL_SECS"));

        assert!(AppConfig::from_lookup(lookup(&[("CATALOG_MAX_PAGE_SIZE", "0")])).is_err());
        assert!(AppConfig::from_lookup(lookup(&[("BIND_ADDR", "nowhere")])).is_err());
    }

    #[test]
    fn debug_output_hides_secrets() {
        let config = AppConfig {
            jwt_secret: "super-secret".to_string(),
            database_url: Some("postgres://user:pw@db/shop".to_string()),
            ..AppConfig::default()
        };
        let dbg = format!("{config:?}");
        assert!(!dbg.contains("super-secret"));
        assert!(!dbg.contains("pw@db"));
    }
}
