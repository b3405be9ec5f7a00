//! Strategies for turning an incoming request into a rate-limit client key.

use axum::http::{HeaderMap, header};
use sha2::{Digest, Sha256};

/// Key used when no per-caller identity is available.
pub const DEFAULT_SHARED_KEY: &str = "CACHE_TOKEN";

pub trait KeyStrategy: Send + Sync + 'static {
    fn client_key(&self, headers: &HeaderMap) -> String;
}

/// Every caller shares one key, so the gate acts as a global throttle.
#[derive(Debug, Clone)]
pub struct SharedKey(pub String);

impl Default for SharedKey {
    fn default() -> Self {
        Self(DEFAULT_SHARED_KEY.to_string())
    }
}

impl KeyStrategy for SharedKey {
    fn client_key(&self, _headers: &HeaderMap) -> String {
        self.0.clone()
    }
}

/// Buckets callers by a SHA-256 digest of their bearer credential.
///
/// The raw credential never leaves this function. Requests without a bearer
/// token fall back to the shared key.
#[derive(Debug, Clone, Default)]
pub struct CredentialHash {
    pub fallback: SharedKey,
}

impl KeyStrategy for CredentialHash {
    fn client_key(&self, headers: &HeaderMap) -> String {
        match bearer_token(headers) {
            Some(token) => {
                let mut hasher = Sha256::new();
                hasher.update(token.as_bytes());
                format!("{:x}", hasher.finalize())
            }
            None => self.fallback.client_key(headers),
        }
    }
}

/// Extracts a non-empty token from `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn with_auth(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn shared_key_ignores_headers() {
        let strategy = SharedKey::default();
        assert_eq!(strategy.client_key(&with_auth("Bearer sk-1")), DEFAULT_SHARED_KEY);
        assert_eq!(strategy.client_key(&HeaderMap::new()), DEFAULT_SHARED_KEY);
    }

    #[test]
    fn credential_hash_is_stable_and_distinct() {
        let strategy = CredentialHash::default();
        let a1 = strategy.client_key(&with_auth("Bearer sk-alpha"));
        let a2 = strategy.client_key(&with_auth("bearer   sk-alpha"));
        let b = strategy.client_key(&with_auth("Bearer sk-beta"));

        assert_eq!(a1, a2);
        assert_ne!(a1, b);
        assert_eq!(a1.len(), 64);
        assert!(!a1.contains("sk-alpha"));
    }

    #[test]
    fn credential_hash_falls_back_without_bearer() {
        let strategy = CredentialHash {
            fallback: SharedKey("anon".to_string()),
        };
        assert_eq!(strategy.client_key(&HeaderMap::new()), "anon");
        assert_eq!(strategy.client_key(&with_auth("Basic dXNlcjpwdw==")), "anon");
        assert_eq!(strategy.client_key(&with_auth("Bearer ")), "anon");
    }
}
