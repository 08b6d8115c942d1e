use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};

use super::{
    normalize_path, validate_bucket, ObjectStore, ObjectStoreError, SignedUrl, StoredObject,
    UrlSigner,
};

/// In-memory object store for tests/dev. Signed URLs point at `signer`'s base URL.
#[derive(Debug)]
pub struct InMemoryObjectStore {
    objects: RwLock<HashMap<(String, String), StoredObject>>,
    signer: UrlSigner,
}

impl InMemoryObjectStore {
    pub fn new(signer: UrlSigner) -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            signer,
        }
    }

    pub fn signer(&self) -> &UrlSigner {
        &self.signer
    }

    pub fn contains(&self, bucket: &str, path: &str) -> bool {
        let Ok(path) = normalize_path(path) else {
            return false;
        };
        self.objects
            .read()
            .map(|objects| objects.contains_key(&(bucket.to_string(), path)))
            .unwrap_or(false)
    }

    fn key(bucket: &str, path: &str) -> Result<(String, String), ObjectStoreError> {
        validate_bucket(bucket)?;
        Ok((bucket.to_string(), normalize_path(path)?))
    }
}

fn poisoned<T>(_: T) -> ObjectStoreError {
    ObjectStoreError::Unavailable("lock poisoned".to_string())
}

#[async_trait::async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), ObjectStoreError> {
        let key = Self::key(bucket, path)?;
        let object = StoredObject {
            bytes,
            content_type: content_type.to_string(),
        };
        self.objects.write().map_err(poisoned)?.insert(key, object);
        Ok(())
    }

    async fn download(&self, bucket: &str, path: &str) -> Result<StoredObject, ObjectStoreError> {
        let key = Self::key(bucket, path)?;
        let objects = self.objects.read().map_err(poisoned)?;
        objects
            .get(&key)
            .cloned()
            .ok_or(ObjectStoreError::NotFound {
                bucket: key.0,
                path: key.1,
            })
    }

    async fn remove(&self, bucket: &str, path: &str) -> Result<(), ObjectStoreError> {
        let key = Self::key(bucket, path)?;
        self.objects.write().map_err(poisoned)?.remove(&key);
        Ok(())
    }

    async fn signed_url(
        &self,
        bucket: &str,
        path: &str,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<SignedUrl, ObjectStoreError> {
        let key = Self::key(bucket, path)?;
        if !self.objects.read().map_err(poisoned)?.contains_key(&key) {
            return Err(ObjectStoreError::NotFound {
                bucket: key.0,
                path: key.1,
            });
        }

        let expires_at = now + ttl;
        Ok(SignedUrl {
            url: self.signer.sign(&key.0, &key.1, expires_at),
            expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object_store::{PRODUCT_COVERS_BUCKET, PRODUCT_FILES_BUCKET};
    use chrono::TimeZone;

    fn store() -> InMemoryObjectStore {
        InMemoryObjectStore::new(UrlSigner::new(b"k".to_vec(), "http://objects.test"))
    }

    #[tokio::test]
    async fn upload_is_an_upsert() {
        let store = store();
        store
            .upload(PRODUCT_FILES_BUCKET, "a.pdf", b"v1".to_vec(), "application/pdf")
            .await
            .unwrap();
        store
            .upload(PRODUCT_FILES_BUCKET, "/a.pdf", b"v2".to_vec(), "application/pdf")
            .await
            .unwrap();

        let obj = store.download(PRODUCT_FILES_BUCKET, "a.pdf").await.unwrap();
        assert_eq!(obj.bytes, b"v2");
        assert_eq!(obj.content_type, "application/pdf");
    }

    #[tokio::test]
    async fn buckets_are_separate_and_remove_is_idempotent() {
        let store = store();
        store
            .upload(PRODUCT_COVERS_BUCKET, "c.png", b"img".to_vec(), "image/png")
            .await
            .unwrap();

        assert!(matches!(
            store.download(PRODUCT_FILES_BUCKET, "c.png").await,
            Err(ObjectStoreError::NotFound { .. })
        ));

        store.remove(PRODUCT_COVERS_BUCKET, "c.png").await.unwrap();
        store.remove(PRODUCT_COVERS_BUCKET, "c.png").await.unwrap();
        assert!(!store.contains(PRODUCT_COVERS_BUCKET, "c.png"));
    }

    #[tokio::test]
    async fn signed_url_requires_existing_object() {
        let store = store();
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();

        let missing = store
            .signed_url(PRODUCT_FILES_BUCKET, "nope.pdf", Duration::seconds(60), now)
            .await;
        assert!(matches!(missing, Err(ObjectStoreError::NotFound { .. })));

        store
            .upload(PRODUCT_FILES_BUCKET, "pdfs/x.pdf", b"%PDF".to_vec(), "application/pdf")
            .await
            .unwrap();
        let signed = store
            .signed_url(PRODUCT_FILES_BUCKET, "pdfs/x.pdf", Duration::seconds(60), now)
            .await
            .unwrap();

        assert_eq!(signed.expires_at, now + Duration::seconds(60));
        assert!(signed.url.starts_with("http://objects.test/product-files/pdfs/x.pdf?expires="));
    }
}
