//! Request identity hashing for entry keys.

use sha2::{Digest, Sha256};

/// Compute the entry key for a request identity (method + URL).
///
/// The method is uppercased so `get` and `GET` address the same entry.
pub fn compute_request_key(method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.to_ascii_uppercase().as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_stability() {
        let a = compute_request_key("GET", "https://egepenakcayapi.com.tr/");
        let b = compute_request_key("GET", "https://egepenakcayapi.com.tr/");
        assert_eq!(a, b);
    }

    #[test]
    fn test_key_method_case_insensitive() {
        let upper = compute_request_key("GET", "https://egepenakcayapi.com.tr/");
        let lower = compute_request_key("get", "https://egepenakcayapi.com.tr/");
        assert_eq!(upper, lower);
    }

    #[test]
    fn test_key_distinguishes_url_and_method() {
        let page = compute_request_key("GET", "https://egepenakcayapi.com.tr/iletisim");
        let other = compute_request_key("GET", "https://egepenakcayapi.com.tr/sss");
        let head = compute_request_key("HEAD", "https://egepenakcayapi.com.tr/iletisim");
        assert_ne!(page, other);
        assert_ne!(page, head);
    }

    #[test]
    fn test_key_format() {
        let key = compute_request_key("GET", "https://egepenakcayapi.com.tr/");
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
