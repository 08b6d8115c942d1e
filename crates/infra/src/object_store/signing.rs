//! HMAC-SHA256 signed object URLs.
//!
//! URL shape: `{base}/{bucket}/{path}?expires={unix}&signature={hex}` where the
//! signature covers `bucket`, `path` and `expires`.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

#[derive(Clone)]
pub struct UrlSigner {
    key: Vec<u8>,
    base_url: String,
}

impl core::fmt::Debug for UrlSigner {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("UrlSigner")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl UrlSigner {
    pub fn new(key: impl Into<Vec<u8>>, base_url: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn sign(&self, bucket: &str, path: &str, expires_at: DateTime<Utc>) -> String {
        let expires = expires_at.timestamp();
        let signature = hex::encode(self.mac(bucket, path, expires).finalize().into_bytes());
        format!(
            "{}/{}/{}?expires={}&signature={}",
            self.base_url, bucket, path, expires, signature
        )
    }

    /// Constant-time check of `signature` and expiry against `now`.
    pub fn verify(&self, bucket: &str, path: &str, expires: i64, signature: &str, now: DateTime<Utc>) -> bool {
        if now.timestamp() > expires {
            return false;
        }
        let Ok(raw) = hex::decode(signature) else {
            return false;
        };
        self.mac(bucket, path, expires).verify_slice(&raw).is_ok()
    }

    fn mac(&self, bucket: &str, path: &str, expires: i64) -> HmacSha256 {
        let mut mac =
            HmacSha256::new_from_slice(&self.key).expect("HMAC-SHA-256 accepts keys of any size");
        mac.update(bucket.as_bytes());
        mac.update(b"\n");
        mac.update(path.as_bytes());
        mac.update(b"\n");
        mac.update(expires.to_string().as_bytes());
        mac
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn signer() -> UrlSigner {
        UrlSigner::new(b"test-key".to_vec(), "http://localhost:8080/objects/")
    }

    fn query_param<'a>(url: &'a str, name: &str) -> &'a str {
        let query = url.split_once('?').unwrap().1;
        query
            .split('&')
            .find_map(|kv| kv.strip_prefix(&format!("{name}=")))
            .unwrap()
    }

    #[test]
    fn signed_url_verifies_until_expiry() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let expires_at = now + Duration::seconds(60);
        let url = signer().sign("product-files", "pdfs/a.pdf", expires_at);

        assert!(url.starts_with("http://localhost:8080/objects/product-files/pdfs/a.pdf?"));
        let expires: i64 = query_param(&url, "expires").parse().unwrap();
        let sig = query_param(&url, "signature");

        assert!(signer().verify("product-files", "pdfs/a.pdf", expires, sig, now));
        assert!(signer().verify("product-files", "pdfs/a.pdf", expires, sig, expires_at));
        assert!(!signer().verify("product-files", "pdfs/a.pdf", expires, sig, expires_at + Duration::seconds(1)));
    }

    #[test]
    fn tampering_breaks_the_signature() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let url = signer().sign("product-files", "pdfs/a.pdf", now + Duration::seconds(60));
        let expires: i64 = query_param(&url, "expires").parse().unwrap();
        let sig = query_param(&url, "signature");

        assert!(!signer().verify("product-files", "pdfs/b.pdf", expires, sig, now));
        assert!(!signer().verify("product-covers", "pdfs/a.pdf", expires, sig, now));
        assert!(!signer().verify("product-files", "pdfs/a.pdf", expires + 3600, sig, now));
        assert!(!signer().verify("product-files", "pdfs/a.pdf", expires, "zz", now));

        let other = UrlSigner::new(b"other-key".to_vec(), "http://x");
        assert!(!other.verify("product-files", "pdfs/a.pdf", expires, sig, now));
    }
}
