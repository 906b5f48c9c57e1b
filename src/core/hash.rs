//! Map Digests
//!
//! The header identifies the running map by SHA-256 and CRC32. The CRC is
//! supplied by the map loader; the SHA-256 can be computed here.

use sha2::{Digest, Sha256};

/// SHA-256 output (256 bits / 32 bytes).
pub type Sha256Digest = [u8; 32];

/// Compute the SHA-256 of raw map data.
pub fn sha256_digest(data: &[u8]) -> Sha256Digest {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Lowercase hex, as written into the header's `map_sha256` field.
pub fn sha256_hex(digest: &Sha256Digest) -> String {
    hex::encode(digest)
}

/// Eight lowercase hex digits, as written into the header's `map_crc` field.
#[inline]
pub fn crc_hex(crc: u32) -> String {
    format!("{:08x}", crc)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_of_empty_map() {
        let digest = sha256_digest(b"");
        assert_eq!(
            sha256_hex(&digest),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_digest_depends_on_content() {
        assert_ne!(sha256_digest(b"dm1"), sha256_digest(b"dm2"));
    }

    #[test]
    fn test_crc_hex_is_zero_padded() {
        assert_eq!(crc_hex(0x1a2b), "00001a2b");
        assert_eq!(crc_hex(0xdeadbeef), "deadbeef");
    }
}
