use std::fmt;

#[cfg(feature = "hashing")]
use sha3::{Digest, Sha3_256};

/// Cache key identifying an ordered pair of request images.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Derive the fingerprint of `(image1, image2)` from the raw request strings.
    ///
    /// Swapping the images yields a different fingerprint.
    pub fn of(image1: &str, image2: &str) -> Self {
        Self(format!("{}:{}", digest(image1), digest(image2)))
    }

    /// The fingerprint as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(feature = "hashing")]
/// Computes SHA3-256 hash of byte data
pub fn compute_sha3_256(data: &[u8]) -> String {
    let mut hasher = Sha3_256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

#[cfg(feature = "hashing")]
fn digest(input: &str) -> String {
    compute_sha3_256(input.as_bytes())
}

#[cfg(not(feature = "hashing"))]
fn digest(input: &str) -> String {
    use std::hash::{Hash, Hasher};

    // Non-cryptographic; collisions are possible but improbable.
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    input.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_deterministic() {
        assert_eq!(Fingerprint::of("abc", "def"), Fingerprint::of("abc", "def"));
    }

    #[test]
    fn test_fingerprint_is_order_sensitive() {
        assert_ne!(Fingerprint::of("abc", "def"), Fingerprint::of("def", "abc"));
    }

    #[test]
    fn test_fingerprint_distinguishes_split_point() {
        assert_ne!(Fingerprint::of("ab", "c"), Fingerprint::of("a", "bc"));
    }

    #[cfg(feature = "hashing")]
    #[test]
    fn test_compute_sha3_256() {
        let hash = compute_sha3_256(b"test content");
        // 64 hex chars for SHA3-256
        assert_eq!(hash.len(), 64);
        assert_eq!(
            compute_sha3_256(b""),
            "a7ffc6f8bf1ed76651c14756a061d662f580ff4de43b49fa82d80a4b80f8434a"
        );
    }

    #[cfg(feature = "hashing")]
    #[test]
    fn test_fingerprint_format() {
        let fp = Fingerprint::of("a", "b");
        let (left, right) = fp.as_str().split_once(':').unwrap();
        assert_eq!(left, compute_sha3_256(b"a"));
        assert_eq!(right, compute_sha3_256(b"b"));
    }
}
