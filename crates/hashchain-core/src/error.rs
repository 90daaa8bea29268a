use thiserror::Error;

/// Errors raised while setting up a chain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// What went wrong with a block during validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationKind {
    /// Stored hash no longer matches the block's own fields.
    HashMismatch,
    /// `previous_hash` does not match the predecessor's hash.
    BrokenLink,
    /// Hash lacks the leading zero digits the difficulty demands.
    InsufficientWork,
}

/// A chain integrity failure, pinned to the first block that exhibits it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("chain integrity violation at block {index}: {kind}")]
pub struct IntegrityViolation {
    pub index: u64,
    pub kind: ViolationKind,
}

impl std::fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            ViolationKind::HashMismatch => "stored hash does not match block contents",
            ViolationKind::BrokenLink => "previous hash does not match predecessor",
            ViolationKind::InsufficientWork => "hash does not meet difficulty",
        };
        f.write_str(msg)
    }
}
