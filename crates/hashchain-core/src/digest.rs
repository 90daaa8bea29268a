use crate::Hash;
use sha2::{Digest, Sha256 as LibSha256};

/// A SHA-256 capability. The chain only ever talks to this trait, so any conforming
/// implementation can be swapped in without touching chain logic.
pub trait DigestEngine: Send + Sync {
    /// 32-byte digest of `data`.
    fn digest(&self, data: &[u8]) -> Hash;

    /// Digest rendered as 64 lowercase hex characters.
    fn digest_hex(&self, data: &[u8]) -> String {
        hex::encode(self.digest(data))
    }

    /// Short label used in logs.
    fn name(&self) -> &'static str;
}

/// Engine backed by the `sha2` crate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Sha2Engine;

impl DigestEngine for Sha2Engine {
    fn digest(&self, data: &[u8]) -> Hash {
        let mut hasher = LibSha256::new();
        hasher.update(data);
        hasher.finalize().into()
    }

    fn name(&self) -> &'static str {
        "sha2"
    }
}

impl<D: DigestEngine + ?Sized> DigestEngine for &D {
    fn digest(&self, data: &[u8]) -> Hash {
        (**self).digest(data)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

impl<D: DigestEngine + ?Sized> DigestEngine for Box<D> {
    fn digest(&self, data: &[u8]) -> Hash {
        (**self).digest(data)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}
