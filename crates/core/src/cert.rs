//! Certificate identifiers and verification URLs.
//!
//! Identifiers look like `CERT-2026-042`: prefix, issue year, and a
//! three-digit random suffix. The suffix is not cryptographic and can
//! collide; callers that need stronger guarantees should check for reuse.

use rand::Rng;
use thiserror::Error;

pub const DEFAULT_PREFIX: &str = "CERT";
pub const DEFAULT_VERIFY_HOST: &str = "certigenie.app";
const VERIFY_PATH: &str = "/verify/";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CertIdError {
    #[error("Invalid certificate id prefix '{0}'")]
    InvalidPrefix(String),
    #[error("Invalid verification host '{0}'")]
    InvalidHost(String),
}

/// `PREFIX-YEAR-NNN` with a zero-padded random suffix in `000..=999`.
pub fn generate_certificate_id<R: Rng + ?Sized>(
    prefix: &str,
    year: i32,
    rng: &mut R,
) -> Result<String, CertIdError> {
    if prefix.is_empty() || prefix.contains(['-', '/', ' ']) {
        return Err(CertIdError::InvalidPrefix(prefix.to_string()));
    }
    let suffix: u32 = rng.gen_range(0..1000);
    Ok(format!("{}-{}-{:03}", prefix, year, suffix))
}

/// `https://<host>/verify/<cert_id>`.
pub fn verify_url(host: &str, cert_id: &str) -> Result<String, CertIdError> {
    if host.is_empty() || host.contains(['/', ' ']) {
        return Err(CertIdError::InvalidHost(host.to_string()));
    }
    Ok(format!("https://{}{}{}", host, VERIFY_PATH, cert_id))
}

/// Extract the certificate id from a verification URL issued for `host`.
///
/// Only `https` URLs whose host matches (port ignored) and whose path starts
/// with `/verify/` are accepted. Query strings and fragments are dropped.
pub fn cert_id_from_url(url: &str, host: &str) -> Option<String> {
    let rest = url.trim().strip_prefix("https://")?;
    let (authority, path) = match rest.find('/') {
        Some(i) => rest.split_at(i),
        None => (rest, ""),
    };
    let hostname = authority.split(':').next().unwrap_or(authority);
    if !hostname.eq_ignore_ascii_case(host) {
        return None;
    }

    let path = path.split(['?', '#']).next().unwrap_or(path);
    let id = path.strip_prefix(VERIFY_PATH)?.split('/').next()?;
    if id.is_empty() {
        return None;
    }
    Some(id.to_string())
}

pub fn is_verify_url(url: &str, host: &str) -> bool {
    cert_id_from_url(url, host).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_generate_certificate_id_format() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let id = generate_certificate_id("CERT", 2026, &mut rng).unwrap();
            let parts: Vec<_> = id.split('-').collect();
            assert_eq!(parts.len(), 3);
            assert_eq!(parts[0], "CERT");
            assert_eq!(parts[1], "2026");
            assert_eq!(parts[2].len(), 3);
            assert!(parts[2].chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_generate_certificate_id_is_seeded() {
        let a = generate_certificate_id("ACME", 2025, &mut StdRng::seed_from_u64(1)).unwrap();
        let b = generate_certificate_id("ACME", 2025, &mut StdRng::seed_from_u64(1)).unwrap();
        assert_eq!(a, b);
        assert!(a.starts_with("ACME-2025-"));
    }

    #[test]
    fn test_invalid_prefix() {
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(
            generate_certificate_id("", 2026, &mut rng),
            Err(CertIdError::InvalidPrefix(String::new()))
        );
        assert!(generate_certificate_id("A-B", 2026, &mut rng).is_err());
    }

    #[test]
    fn test_verify_url() {
        assert_eq!(
            verify_url("certigenie.app", "CERT-2026-001").unwrap(),
            "https://certigenie.app/verify/CERT-2026-001"
        );
        assert!(verify_url("bad/host", "x").is_err());
    }

    #[test]
    fn test_cert_id_from_url() {
        let host = "certigenie.app";
        assert_eq!(
            cert_id_from_url("https://certigenie.app/verify/CERT-2026-001", host),
            Some("CERT-2026-001".to_string())
        );
        assert_eq!(
            cert_id_from_url("https://certigenie.app:443/verify/CERT-1?ref=qr#top", host),
            Some("CERT-1".to_string())
        );
    }

    #[test]
    fn test_rejected_urls() {
        let host = "certigenie.app";
        assert!(!is_verify_url("http://certigenie.app/verify/CERT-1", host));
        assert!(!is_verify_url("https://evil.example/verify/CERT-1", host));
        assert!(!is_verify_url("https://certigenie.app/check/CERT-1", host));
        assert!(!is_verify_url("https://certigenie.app/verify/", host));
        assert!(!is_verify_url("not a url", host));
    }

    #[test]
    fn test_round_trip_through_url() {
        let url = verify_url("example.org", "X-2024-999").unwrap();
        assert_eq!(cert_id_from_url(&url, "example.org").as_deref(), Some("X-2024-999"));
    }
}
