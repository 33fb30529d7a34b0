//! Content-addressed cache keys

use sha2::{Digest, Sha256};
use std::fmt;

use crate::voice::Voice;

const KEY_SEPARATOR: &[u8] = b"\x1f";

/// SHA-256 fingerprint of (unit content, voice) as 64 lower-case hex chars.
///
/// The same string names the memory entry and the on-disk file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(content: &str, voice: Voice) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());
        hasher.update(KEY_SEPARATOR);
        hasher.update(voice.as_str().as_bytes());
        Self(format!("{:x}", hasher.finalize()))
    }

    /// Accept an existing hex fingerprint, e.g. a file name.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let valid = hex.len() == 64 && hex.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
        valid.then(|| Self(hex.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_is_stable() {
        let a = CacheKey::new("Hello there.", Voice::Nova);
        let b = CacheKey::new("Hello there.", Voice::Nova);
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 64);
        assert!(CacheKey::from_hex(a.as_str()).is_some());
    }

    #[test]
    fn test_voice_changes_key() {
        let a = CacheKey::new("Hello there.", Voice::Nova);
        let b = CacheKey::new("Hello there.", Voice::Echo);
        assert_ne!(a, b);
    }

    #[test]
    fn test_from_hex_rejects_garbage() {
        assert!(CacheKey::from_hex("../etc/passwd").is_none());
        assert!(CacheKey::from_hex(&"A".repeat(64)).is_none());
        assert!(CacheKey::from_hex(&"a".repeat(63)).is_none());
    }
}
