//! Presigned download addresses.
//!
//! ```text
//! {public_base_url}/{key}?expires={unix_seconds}&signature={hex}
//! signature = HMAC-SHA256(secret, "GET\n{key}\n{expires}")
//! ```
//!
//! Anyone holding the URL can read the object until `expires`; nothing in
//! the URL reveals the secret or the physical storage location.

use super::backend::StorageError;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

fn canonical(key: &str, expires: i64) -> String {
    format!("GET\n{key}\n{expires}")
}

fn mac(secret: &str) -> Result<HmacSha256, StorageError> {
    HmacSha256::new_from_slice(secret.as_bytes()).map_err(|e| StorageError::Presign(e.to_string()))
}

/// Hex-encoded signature for `key` valid until `expires`.
pub fn sign(secret: &str, key: &str, expires: i64) -> Result<String, StorageError> {
    let mut mac = mac(secret)?;
    mac.update(canonical(key, expires).as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time check of a signature, plus expiry against `now`.
pub fn verify(secret: &str, key: &str, expires: i64, signature: &str, now: i64) -> bool {
    if now > expires {
        return false;
    }
    let Ok(expected) = hex::decode(signature) else {
        return false;
    };
    let Ok(mut mac) = mac(secret) else {
        return false;
    };
    mac.update(canonical(key, expires).as_bytes());
    mac.verify_slice(&expected).is_ok()
}

/// Split a presigned URL back into `(key, expires, signature)`.
pub fn parse_url<'a>(base_url: &str, url: &'a str) -> Option<(&'a str, i64, &'a str)> {
    let rest = url.strip_prefix(base_url)?.strip_prefix('/')?;
    let (key, query) = rest.split_once('?')?;
    let mut expires = None;
    let mut signature = None;
    for pair in query.split('&') {
        match pair.split_once('=') {
            Some(("expires", v)) => expires = v.parse().ok(),
            Some(("signature", v)) => signature = Some(v),
            _ => {}
        }
    }
    Some((key, expires?, signature?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_is_deterministic_hex() {
        let a = sign("secret", "projects/p/display/x/a.jpg", 1_700_000_000).unwrap();
        let b = sign("secret", "projects/p/display/x/a.jpg", 1_700_000_000).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn signature_binds_key_expiry_and_secret() {
        let base = sign("secret", "k/1", 100).unwrap();
        assert_ne!(base, sign("secret", "k/2", 100).unwrap());
        assert_ne!(base, sign("secret", "k/1", 101).unwrap());
        assert_ne!(base, sign("other", "k/1", 100).unwrap());
    }

    #[test]
    fn verify_accepts_valid_until_expiry() {
        let sig = sign("secret", "k/1", 100).unwrap();
        assert!(verify("secret", "k/1", 100, &sig, 50));
        assert!(verify("secret", "k/1", 100, &sig, 100));
        assert!(!verify("secret", "k/1", 100, &sig, 101));
    }

    #[test]
    fn verify_rejects_tampering() {
        let sig = sign("secret", "k/1", 100).unwrap();
        assert!(!verify("secret", "k/2", 100, &sig, 0));
        assert!(!verify("secret", "k/1", 200, &sig, 0));
        assert!(!verify("wrong", "k/1", 100, &sig, 0));
        assert!(!verify("secret", "k/1", 100, "not-hex", 0));
    }

    #[test]
    fn parse_url_round_trip() {
        let url = "https://cdn.test/projects/p/a.jpg?expires=123&signature=abcd";
        assert_eq!(
            parse_url("https://cdn.test", url),
            Some(("projects/p/a.jpg", 123, "abcd"))
        );
        assert_eq!(parse_url("https://other", url), None);
        assert_eq!(parse_url("https://cdn.test", "https://cdn.test/k?expires=1"), None);
    }
}
