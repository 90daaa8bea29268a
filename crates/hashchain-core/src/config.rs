use crate::constants::{DEFAULT_DIFFICULTY, HASH_HEX_SIZE};
use crate::error::ChainError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of leading `'0'` hex digits a mined block hash must carry.
///
/// Zero means every hash qualifies. Anything above the 64 digits of a digest is rejected,
/// as is any negative input.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u32")]
pub struct Difficulty(u32);

impl Difficulty {
    pub fn new(zeros: u32) -> Result<Self, ChainError> {
        if zeros as usize > HASH_HEX_SIZE {
            return Err(ChainError::InvalidConfiguration(format!(
                "difficulty {zeros} exceeds the {HASH_HEX_SIZE} hex digits of a digest"
            )));
        }
        Ok(Self(zeros))
    }

    pub fn zeros(self) -> u32 {
        self.0
    }
}

impl Default for Difficulty {
    fn default() -> Self {
        Self(DEFAULT_DIFFICULTY)
    }
}

impl TryFrom<i64> for Difficulty {
    type Error = ChainError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        let zeros = u32::try_from(value).map_err(|_| {
            ChainError::InvalidConfiguration(format!(
                "difficulty must be a non-negative number of hex digits, got {value}"
            ))
        })?;
        Self::new(zeros)
    }
}

impl From<Difficulty> for u32 {
    fn from(d: Difficulty) -> Self {
        d.0
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How `add_block` searches the nonce space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MiningStrategy {
    /// Try nonces 0, 1, 2, ... on the calling thread.
    #[default]
    Sequential,
    /// Split the nonce space across the rayon pool; any qualifying nonce wins.
    Parallel,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    pub difficulty: Difficulty,
    pub strategy: MiningStrategy,
    /// Also re-check the difficulty prefix of every non-genesis block during validation.
    /// Off by default: difficulty is enforced when a block is mined, not on read.
    pub verify_work: bool,
}

impl ChainConfig {
    pub fn with_difficulty(difficulty: Difficulty) -> Self {
        Self {
            difficulty,
            ..Self::default()
        }
    }
}
