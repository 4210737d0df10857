use base64::prelude::BASE64_STANDARD;
use base64::Engine;
use sha2::{Digest, Sha256, Sha384, Sha512};

/// Compute the SHA-512 digest of a byte slice, base64-encoded.
#[must_use]
pub fn sha512_base64(data: &[u8]) -> String {
    BASE64_STANDARD.encode(Sha512::digest(data))
}

/// Compute the SHA-384 digest of a byte slice, base64-encoded.
#[must_use]
pub fn sha384_base64(data: &[u8]) -> String {
    BASE64_STANDARD.encode(Sha384::digest(data))
}

/// Compute the SHA-256 digest of a byte slice, base64-encoded.
#[must_use]
pub fn sha256_base64(data: &[u8]) -> String {
    BASE64_STANDARD.encode(Sha256::digest(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha512_base64_empty() {
        // Well-known digest of the empty input
        assert_eq!(
            sha512_base64(b""),
            "z4PhNX7vuL3xVChQ1m2AB9Yg5AULVxXcg/SpIdNs6c5H0NE8XYXysP+DGNKHfuwvY7kxvUdBeoGlODJ6+SfaPg=="
        );
    }

    #[test]
    fn test_sha256_base64_empty() {
        assert_eq!(
            sha256_base64(b""),
            "47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU="
        );
    }

    #[test]
    fn test_digest_lengths() {
        // base64 of 64/48/32-byte digests, with padding
        assert_eq!(sha512_base64(b"sprig").len(), 88);
        assert_eq!(sha384_base64(b"sprig").len(), 64);
        assert_eq!(sha256_base64(b"sprig").len(), 44);
    }

    #[test]
    fn test_digest_is_deterministic() {
        assert_eq!(sha512_base64(b"abc"), sha512_base64(b"abc"));
        assert_ne!(sha512_base64(b"abc"), sha512_base64(b"abd"));
    }
}
