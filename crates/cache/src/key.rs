//! Cache key derivation: RFC 7234 §4.1 keys a stored response by request
//! method and effective URI, then selects among multiple stored
//! responses for that URI using the `Vary` header's named request
//! headers.

use http::{HeaderMap, Method};
use sha2::{Digest, Sha256};

/// Identifies a cached response: a hash of method, URL, and the
/// request-header values named by a previously stored `Vary` header.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Fingerprint(pub(crate) [u8; 32]);

impl Fingerprint {
    /// Derive a fingerprint for `method`/`url`, projecting `vary_headers`
    /// (the `Vary` response header from a prior response for this URL, if
    /// any) out of `request_headers`.
    #[must_use]
    pub fn compute(method: &Method, url: &str, request_headers: &HeaderMap, vary_headers: &[String]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(method.as_str().as_bytes());
        hasher.update(b"\0");
        hasher.update(url.as_bytes());
        let mut names: Vec<&String> = vary_headers.iter().collect();
        names.sort();
        for name in names {
            hasher.update(b"\0");
            hasher.update(name.to_lowercase().as_bytes());
            hasher.update(b"=");
            if let Some(value) = request_headers.get(name.as_str()) {
                hasher.update(value.as_bytes());
            }
        }
        let digest = hasher.finalize();
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&digest);
        Self(bytes)
    }

    /// Hex-encoded form, used as a content-addressed disk-tier filename.
    #[must_use]
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}
