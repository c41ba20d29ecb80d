use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Cache identity of a content payload. Two equal payload strings always map
/// to the same fingerprint; equal fingerprints are treated as equal content
/// without re-checking the payload bytes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(u64);

impl Fingerprint {
    pub fn of(payload: &str) -> Self {
        let mut hasher = DefaultHasher::new();
        payload.hash(&mut hasher);
        Self(hasher.finish())
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_payload_same_fingerprint() {
        assert_eq!(Fingerprint::of("https://openbase.org"), Fingerprint::of("https://openbase.org"));
    }

    #[test]
    fn different_payloads_differ() {
        assert_ne!(Fingerprint::of("<html>a</html>"), Fingerprint::of("<html>b</html>"));
    }
}
