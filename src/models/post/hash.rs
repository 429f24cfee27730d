use camino::Utf8Path;
use sha2::{Digest as _, Sha256};

use crate::error::BooruError;

/// The content-addressable identity of a post: the sha256 of its bytes,
/// hex-encoded.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentHash(String);

impl ContentHash {
    /// Hashes some bytes in memory.
    pub fn of_bytes(bytes: impl AsRef<[u8]>) -> Self {
        Self(hex::encode(Sha256::digest(bytes.as_ref())))
    }

    /// Hashes the file at the given path.
    #[tracing::instrument]
    pub async fn of_file(path: &Utf8Path) -> Result<Self, std::io::Error> {
        let bytes = tokio::fs::read(path)
            .await
            .inspect_err(|e| tracing::warn!("Failed to read file for hashing! err: {e}"))?;
        Ok(Self::of_bytes(bytes))
    }

    /// Wraps an existing hex digest, if it looks like one.
    pub fn from_hex(digest: &str) -> Option<Self> {
        let digest = digest.trim().to_ascii_lowercase();
        (digest.len() == 64 && digest.bytes().all(|b| b.is_ascii_hexdigit())).then_some(Self(digest))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ContentHash {
    type Error = BooruError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::from_hex(&raw).ok_or(BooruError::InvalidContentHash { raw })
    }
}

impl From<ContentHash> for String {
    fn from(hash: ContentHash) -> Self {
        hash.0
    }
}

impl core::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::ContentHash;

    #[test]
    fn known_digest() {
        let hash = ContentHash::of_bytes(b"abc");
        assert_eq!(
            hash.as_str(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn from_hex_checks_shape() {
        let hash = ContentHash::of_bytes(b"abc");
        assert_eq!(
            ContentHash::from_hex(&hash.as_str().to_uppercase()),
            Some(hash)
        );
        assert_eq!(ContentHash::from_hex("abc"), None);
        assert_eq!(ContentHash::from_hex(&"z".repeat(64)), None);
    }

    #[derive(Debug, serde::Serialize, serde::Deserialize)]
    struct Stored {
        hash: ContentHash,
    }

    #[test]
    fn deserializing_checks_shape() {
        let short: Result<Stored, _> = toml::from_str(r#"hash = "ab""#);
        let err = short.unwrap_err().to_string();
        assert!(err.contains("isn't a hex-encoded sha256 digest"), "{err}");

        let stored = Stored {
            hash: ContentHash::of_bytes(b"abc"),
        };
        let text = toml::to_string(&stored).unwrap();
        assert!(text.contains("ba7816bf"), "{text}");

        let upper = text.to_uppercase().replace("HASH", "hash");
        let back: Stored = toml::from_str(&upper).unwrap();
        assert_eq!(back.hash, stored.hash);
    }
}
