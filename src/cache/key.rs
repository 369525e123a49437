//! Content-hash keys for paths and path prefixes
//!
//! Cache keys are 20-byte SHA-1 digests over the raw path bytes, held
//! as a fixed-size array value type. Collision probability is assumed
//! negligible and never checked. Using the digest as the key keeps
//! cache memory independent of path length.

use sha1::{Digest, Sha1};

/// Digest width in bytes.
pub const KEY_LEN: usize = 20;

/// A 20-byte content hash identifying a path or path prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PathKey([u8; KEY_LEN]);

impl PathKey {
    /// Hash the raw bytes of a path or prefix.
    pub fn of(path: &[u8]) -> Self {
        let mut hasher = Sha1::new();
        hasher.update(path);
        PathKey(hasher.finalize().into())
    }

    /// The digest bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl From<[u8; KEY_LEN]> for PathKey {
    fn from(digest: [u8; KEY_LEN]) -> Self {
        PathKey(digest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_is_deterministic() {
        let a = PathKey::of(b"a.b.c");
        let b = PathKey::of(b"a.b.c");
        assert_eq!(a, b);
    }

    #[test]
    fn test_prefix_keys_differ_from_leaf() {
        let leaf = PathKey::of(b"a.b.c");
        let parent = PathKey::of(b"a.b.");
        let root = PathKey::of(b"a.");
        assert_ne!(leaf, parent);
        assert_ne!(parent, root);
    }

    #[test]
    fn test_known_sha1_vector() {
        // SHA-1("abc") = a9993e364706816aba3e25717850c26c9cd0d89d
        let key = PathKey::of(b"abc");
        assert_eq!(
            key.as_bytes(),
            &[
                0xa9, 0x99, 0x3e, 0x36, 0x47, 0x06, 0x81, 0x6a, 0xba, 0x3e, 0x25, 0x71, 0x78,
                0x50, 0xc2, 0x6c, 0x9c, 0xd0, 0xd8, 0x9d,
            ]
        );
    }
}
