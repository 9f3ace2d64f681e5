use sha1::{Digest, Sha1};

use crate::{HashError, ObjectId};

/// Streaming SHA-1 computation.
///
/// Data can be fed incrementally with [`update`](Hasher::update) or through
/// the [`std::io::Write`] implementation, then finalized into an [`ObjectId`].
pub struct Hasher {
    inner: Sha1,
}

impl Hasher {
    pub fn new() -> Self {
        Self { inner: Sha1::new() }
    }

    /// Feed data into the hasher.
    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    /// Finalize and return the ObjectId.
    pub fn finalize(self) -> ObjectId {
        let result = self.inner.finalize();
        ObjectId::from_bytes(result.as_slice()).expect("sha1 digest is always 20 bytes")
    }

    /// Convenience: hash data in one call.
    pub fn digest(data: &[u8]) -> ObjectId {
        let mut h = Self::new();
        h.update(data);
        h.finalize()
    }

    /// Hash a git object: `"{type} {len}\0{content}"` (§4.9/blob hash caching).
    pub fn hash_object(obj_type: &str, data: &[u8]) -> Result<ObjectId, HashError> {
        let header = format!("{} {}\0", obj_type, data.len());
        let mut h = Self::new();
        h.update(header.as_bytes());
        h.update(data);
        Ok(h.finalize())
    }
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl std::io::Write for Hasher {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_matches_known_sha1() {
        // echo -n "" | sha1sum
        let oid = Hasher::digest(b"");
        assert_eq!(oid.to_hex(), "da39a3ee5e6b4b0d3255bfef95601890afd80709");
    }

    #[test]
    fn hash_object_differs_from_raw_digest() {
        // The object hash includes the "blob <len>\0" header, so it must not
        // equal a bare digest of the content.
        let raw = Hasher::digest(b"hello\n");
        let object = Hasher::hash_object("blob", b"hello\n").unwrap();
        assert_ne!(raw, object);
    }

    #[test]
    fn hash_object_is_deterministic() {
        let a = Hasher::hash_object("blob", b"same content").unwrap();
        let b = Hasher::hash_object("blob", b"same content").unwrap();
        assert_eq!(a, b);
    }
}
