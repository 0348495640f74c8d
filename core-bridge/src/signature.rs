//! Release-signature check.
//!
//! The host hands over the raw bytes of the package signing certificate. The
//! build counts as release-signed when the SHA-1 digest of those bytes matches
//! the configured fingerprint. Fingerprints are compared in lowercase with
//! colons removed, so both `86:9D:11:...` and `869d11...` spellings work.

use sha1::{Digest, Sha1};

/// Lowercase hex SHA-1 of a certificate.
pub fn certificate_fingerprint(certificate: &[u8]) -> String {
    hex::encode(Sha1::digest(certificate))
}

/// Lowercase a fingerprint and drop its colon separators.
pub fn normalize_fingerprint(fingerprint: &str) -> String {
    fingerprint
        .chars()
        .filter(|c| *c != ':')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Whether `certificate` hashes to `expected`.
pub fn matches_fingerprint(certificate: &[u8], expected: &str) -> bool {
    certificate_fingerprint(certificate) == normalize_fingerprint(expected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_runtime::config::DEFAULT_RELEASE_FINGERPRINT;

    const ABC_SHA1: &str = "a9993e364706816aba3e25717850c26c9cd0d89d";

    #[test]
    fn test_certificate_fingerprint() {
        assert_eq!(certificate_fingerprint(b"abc"), ABC_SHA1);
    }

    #[test]
    fn test_normalize_fingerprint() {
        assert_eq!(
            normalize_fingerprint(DEFAULT_RELEASE_FINGERPRINT),
            "869d118b631ef835c6d9c26653bc28222fb8c1ae"
        );
        assert_eq!(normalize_fingerprint(ABC_SHA1), ABC_SHA1);
    }

    #[test]
    fn test_matches_colon_separated_uppercase() {
        let expected = "A9:99:3E:36:47:06:81:6A:BA:3E:25:71:78:50:C2:6C:9C:D0:D8:9D";
        assert!(matches_fingerprint(b"abc", expected));
    }

    #[test]
    fn test_other_certificate_does_not_match() {
        assert!(!matches_fingerprint(b"abd", ABC_SHA1));
        assert!(!matches_fingerprint(b"abc", DEFAULT_RELEASE_FINGERPRINT));
        assert!(!matches_fingerprint(b"", ABC_SHA1));
    }
}
