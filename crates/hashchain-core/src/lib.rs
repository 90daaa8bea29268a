pub mod chain;
pub mod config;
pub mod constants;
pub mod digest;
pub mod error;
pub mod mine;
pub mod sha256;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

pub use chain::Chain;
pub use config::{ChainConfig, Difficulty, MiningStrategy};
pub use digest::{DigestEngine, Sha2Engine};
pub use error::{ChainError, IntegrityViolation, ViolationKind};
pub use sha256::Sha256;

pub type Hash = [u8; 32];

/// Seconds since the UNIX epoch; a clock set before 1970 reads as 0.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Canonical preimage up to (but excluding) the nonce: decimal index, decimal timestamp,
/// raw payload, previous hash text. No separators.
fn preimage_prefix(index: u64, timestamp: u64, payload: &[u8], previous_hash: &str) -> Vec<u8> {
    let head = format!("{index}{timestamp}");
    let mut bytes = Vec::with_capacity(head.len() + payload.len() + previous_hash.len() + 20);
    bytes.extend_from_slice(head.as_bytes());
    bytes.extend_from_slice(payload);
    bytes.extend_from_slice(previous_hash.as_bytes());
    bytes
}

fn push_nonce(bytes: &mut Vec<u8>, nonce: u64) {
    bytes.extend_from_slice(nonce.to_string().as_bytes());
}

/// An unsealed block: every field fixed except the nonce, which the miner is free to vary.
/// It has no stored hash; one is derived per attempt and kept only once the block is sealed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Candidate {
    index: u64,
    timestamp: u64,
    payload: Vec<u8>,
    previous_hash: String,
}

impl Candidate {
    pub fn new(
        index: u64,
        timestamp: u64,
        payload: impl Into<Vec<u8>>,
        previous_hash: impl Into<String>,
    ) -> Self {
        Self {
            index,
            timestamp,
            payload: payload.into(),
            previous_hash: previous_hash.into(),
        }
    }

    /// Candidate stamped with the current time.
    pub fn now(index: u64, payload: impl Into<Vec<u8>>, previous_hash: impl Into<String>) -> Self {
        Self::new(index, unix_now(), payload, previous_hash)
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Preimage bytes with everything but the nonce filled in.
    pub fn hash_prefix(&self) -> Vec<u8> {
        preimage_prefix(self.index, self.timestamp, &self.payload, &self.previous_hash)
    }

    /// Full canonical preimage for a given nonce.
    pub fn hash_bytes(&self, nonce: u64) -> Vec<u8> {
        let mut bytes = self.hash_prefix();
        push_nonce(&mut bytes, nonce);
        bytes
    }

    /// Fixes `nonce` and records the matching hash. The result can no longer change.
    pub fn seal<D: DigestEngine>(self, nonce: u64, engine: &D) -> Block {
        let hash = engine.digest_hex(&self.hash_bytes(nonce));
        Block {
            index: self.index,
            timestamp: self.timestamp,
            payload: self.payload,
            previous_hash: self.previous_hash,
            nonce,
            hash,
        }
    }
}

/// A sealed block. Fields are read-only to callers; the chain only ever holds sealed blocks.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    index: u64,
    timestamp: u64,
    #[serde(with = "hex")]
    payload: Vec<u8>,
    previous_hash: String,
    nonce: u64,
    hash: String,
}

impl Block {
    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn previous_hash(&self) -> &str {
        &self.previous_hash
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn hash_bytes(&self) -> Vec<u8> {
        let mut bytes =
            preimage_prefix(self.index, self.timestamp, &self.payload, &self.previous_hash);
        push_nonce(&mut bytes, self.nonce);
        bytes
    }

    /// Re-derives the hash from the block's current fields.
    pub fn calculate_hash<D: DigestEngine>(&self, engine: &D) -> String {
        engine.digest_hex(&self.hash_bytes())
    }

    /// Does the stored hash carry at least `difficulty` leading `'0'` hex digits?
    pub fn meets_difficulty(&self, difficulty: Difficulty) -> bool {
        mine::has_leading_zero_digits(&self.hash, difficulty)
    }
}

#[cfg(test)]
impl Block {
    pub(crate) fn set_payload(&mut self, payload: impl Into<Vec<u8>>) {
        self.payload = payload.into();
    }

    pub(crate) fn set_hash(&mut self, hash: impl Into<String>) {
        self.hash = hash.into();
    }

    pub(crate) fn set_nonce(&mut self, nonce: u64) {
        self.nonce = nonce;
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Index: {}", self.index)?;
        writeln!(f, "Timestamp: {}", self.timestamp)?;
        writeln!(f, "Data: {}", String::from_utf8_lossy(&self.payload))?;
        writeln!(f, "Prev Hash: {}", self.previous_hash)?;
        writeln!(f, "Hash: {}", self.hash)?;
        writeln!(f, "Nonce: {}", self.nonce)?;
        write!(f, "------------------------")
    }
}
