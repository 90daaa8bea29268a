use crate::constants::{GENESIS_PAYLOAD, GENESIS_PREVIOUS_HASH};
use crate::error::{ChainError, IntegrityViolation, ViolationKind};
use crate::mine::mine_with;
use crate::{unix_now, Block, Candidate, ChainConfig, Difficulty, DigestEngine, Sha256};
use tracing::{debug, warn};

/// In-memory hash chain. Owns its blocks outright: they enter only through
/// [`Chain::add_block`], already sealed, and are never handed out mutably.
#[derive(Clone, Debug)]
pub struct Chain<D: DigestEngine = Sha256> {
    blocks: Vec<Block>,
    config: ChainConfig,
    engine: D,
}

impl Chain<Sha256> {
    /// Chain at the default difficulty, hashing with the built-in engine.
    pub fn new() -> Self {
        Self::with_config(ChainConfig::default(), Sha256)
    }

    /// Rejects negative difficulties and ones wider than a digest.
    pub fn with_difficulty(difficulty: i64) -> Result<Self, ChainError> {
        let difficulty = Difficulty::try_from(difficulty)?;
        Ok(Self::with_config(ChainConfig::with_difficulty(difficulty), Sha256))
    }
}

impl Default for Chain<Sha256> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: DigestEngine> Chain<D> {
    pub fn with_config(config: ChainConfig, engine: D) -> Self {
        let genesis = genesis_block(&engine);
        debug!(
            hash = genesis.hash(),
            difficulty = %config.difficulty,
            engine = engine.name(),
            "created genesis block"
        );
        Self {
            blocks: vec![genesis],
            config,
            engine,
        }
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    pub fn difficulty(&self) -> Difficulty {
        self.config.difficulty
    }

    pub fn engine(&self) -> &D {
        &self.engine
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Always false: a chain holds at least its genesis block.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn tip(&self) -> &Block {
        // Construction pushes genesis and nothing ever removes a block.
        &self.blocks[self.blocks.len() - 1]
    }

    /// Mines `payload` on top of the current tip and appends it. Blocks until a
    /// qualifying nonce turns up; cannot fail.
    pub fn add_block(&mut self, payload: impl Into<Vec<u8>>) -> &Block {
        let candidate = Candidate::now(self.blocks.len() as u64, payload, self.tip().hash());
        let block = mine_with(
            candidate,
            self.config.difficulty,
            self.config.strategy,
            &self.engine,
        );
        self.blocks.push(block);
        self.tip()
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Walks positions 1.. and stops at the first block whose hash no longer matches its
    /// fields or whose link to its predecessor is broken. With `verify_work` set, a hash
    /// missing the difficulty prefix also counts. Genesis is never checked.
    pub fn validate(&self) -> Result<(), IntegrityViolation> {
        match self.scan().next() {
            Some(violation) => {
                warn!("Invalid block at index {}: {}", violation.index, violation.kind);
                Err(violation)
            }
            None => Ok(()),
        }
    }

    /// Like [`Chain::validate`] but keeps going and reports every violation.
    pub fn audit(&self) -> Vec<IntegrityViolation> {
        let violations: Vec<_> = self.scan().collect();
        for v in &violations {
            warn!("Invalid block at index {}: {}", v.index, v.kind);
        }
        violations
    }

    fn scan(&self) -> impl Iterator<Item = IntegrityViolation> + '_ {
        self.blocks.windows(2).flat_map(move |pair| {
            let (previous, current) = (&pair[0], &pair[1]);
            self.check_block(previous, current)
        })
    }

    fn check_block(&self, previous: &Block, current: &Block) -> Vec<IntegrityViolation> {
        let mut found = Vec::new();
        let mut flag = |kind| {
            found.push(IntegrityViolation {
                index: current.index(),
                kind,
            })
        };
        if current.calculate_hash(&self.engine) != current.hash() {
            flag(ViolationKind::HashMismatch);
        }
        if current.previous_hash() != previous.hash() {
            flag(ViolationKind::BrokenLink);
        }
        if self.config.verify_work && !current.meets_difficulty(self.config.difficulty) {
            flag(ViolationKind::InsufficientWork);
        }
        found
    }

    #[cfg(test)]
    pub(crate) fn block_mut(&mut self, position: usize) -> &mut Block {
        &mut self.blocks[position]
    }
}

/// The unmined first block: index 0, fixed payload, `"0"` as previous hash.
pub fn genesis_block<D: DigestEngine>(engine: &D) -> Block {
    Candidate::new(0, unix_now(), GENESIS_PAYLOAD, GENESIS_PREVIOUS_HASH).seal(0, engine)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MiningStrategy, Sha2Engine};

    fn chain_at(difficulty: u32) -> Chain {
        Chain::with_config(
            ChainConfig::with_difficulty(Difficulty::new(difficulty).unwrap()),
            Sha256,
        )
    }

    fn demo_chain() -> Chain {
        let mut chain = chain_at(2);
        chain.add_block("Alice pays Bob 10 BTC");
        chain.add_block("Bob pays Charlie 5 BTC");
        chain.add_block("Charlie pays Dave 2 BTC");
        chain
    }

    #[test]
    fn genesis_block_example() {
        let chain = Chain::new();
        assert_eq!(chain.difficulty().zeros(), 3);
        assert_eq!(chain.len(), 1);
        assert!(!chain.is_empty());
        let genesis = &chain.blocks()[0];
        assert_eq!(genesis.index(), 0);
        assert_eq!(genesis.previous_hash(), "0");
        assert_eq!(genesis.payload(), b"Genesis Block");
        assert_eq!(genesis.nonce(), 0);
        assert_eq!(genesis.calculate_hash(&Sha256), genesis.hash());
        assert!(chain.is_valid());
    }

    #[test]
    fn with_difficulty_rejects_negative() {
        let err = Chain::with_difficulty(-3).unwrap_err();
        assert!(matches!(err, ChainError::InvalidConfiguration(_)));
        assert!(Chain::with_difficulty(65).is_err());
        assert_eq!(Chain::with_difficulty(1).unwrap().difficulty().zeros(), 1);
    }

    #[test]
    fn add_block_grows_by_one_and_links() {
        let mut chain = chain_at(2);
        let before_tip = chain.tip().hash().to_string();
        let added = chain.add_block("Alice pays Bob 10 BTC").clone();
        assert_eq!(chain.len(), 2);
        assert_eq!(added.index(), 1);
        assert_eq!(added.previous_hash(), before_tip);
        assert_eq!(chain.tip(), &added);
    }

    #[test]
    fn add_block_leaves_history_untouched() {
        let mut chain = demo_chain();
        let snapshot = chain.blocks().to_vec();
        chain.add_block("Dave pays Erin 1 BTC");
        assert_eq!(&chain.blocks()[..snapshot.len()], snapshot.as_slice());
    }

    #[test]
    fn mined_blocks_meet_difficulty() {
        let chain = demo_chain();
        for block in &chain.blocks()[1..] {
            assert!(block.hash().starts_with("00"), "{}", block.hash());
            assert!(block.meets_difficulty(chain.difficulty()));
        }
    }

    #[test]
    fn zero_difficulty_accepts_first_nonce() {
        let mut chain = chain_at(0);
        let block = chain.add_block("anything");
        assert_eq!(block.nonce(), 0);
    }

    #[test]
    fn empty_payload_block() {
        let mut chain = chain_at(1);
        chain.add_block(Vec::<u8>::new());
        assert_eq!(chain.tip().payload(), b"");
        assert!(chain.is_valid());
    }

    #[test]
    fn built_chain_is_valid() {
        let chain = demo_chain();
        assert!(chain.is_valid());
        assert_eq!(chain.validate(), Ok(()));
        assert!(chain.audit().is_empty());
    }

    #[test]
    fn indices_are_sequential() {
        let chain = demo_chain();
        for (i, block) in chain.blocks().iter().enumerate() {
            assert_eq!(block.index(), i as u64);
        }
    }

    #[test]
    fn tampered_payload_detected_at_that_index() {
        let mut chain = demo_chain();
        chain.block_mut(2).set_payload("Bob pays Mallory 500 BTC");
        assert!(!chain.is_valid());
        assert_eq!(
            chain.validate(),
            Err(IntegrityViolation {
                index: 2,
                kind: ViolationKind::HashMismatch
            })
        );
    }

    #[test]
    fn rehashed_tamper_breaks_the_next_link() {
        let mut chain = demo_chain();
        let block = chain.block_mut(1);
        block.set_payload("Alice pays Mallory 10 BTC");
        let rehashed = block.calculate_hash(&Sha256);
        block.set_hash(rehashed);

        assert_eq!(
            chain.validate(),
            Err(IntegrityViolation {
                index: 2,
                kind: ViolationKind::BrokenLink
            })
        );
    }

    #[test]
    fn tampered_genesis_breaks_link_of_block_one() {
        let mut chain = demo_chain();
        chain.block_mut(0).set_hash("0".repeat(64));
        assert_eq!(
            chain.validate(),
            Err(IntegrityViolation {
                index: 1,
                kind: ViolationKind::BrokenLink
            })
        );
    }

    #[test]
    fn audit_reports_every_violation() {
        let mut chain = demo_chain();
        chain.block_mut(1).set_payload("forged");
        chain.block_mut(3).set_payload("forged too");
        let found = chain.audit();
        assert_eq!(
            found,
            vec![
                IntegrityViolation {
                    index: 1,
                    kind: ViolationKind::HashMismatch
                },
                IntegrityViolation {
                    index: 3,
                    kind: ViolationKind::HashMismatch
                },
            ]
        );
    }

    #[test]
    fn work_is_not_rechecked_by_default() {
        let mut chain = demo_chain();
        // Find a nonce whose hash misses the prefix and re-seal block 3 (the tip) with it.
        let tip = chain.tip().clone();
        let nonce = (0u64..)
            .find(|n| {
                let mut probe = tip.clone();
                probe.set_nonce(*n);
                !probe.calculate_hash(&Sha256).starts_with("00")
            })
            .unwrap();
        let block = chain.block_mut(3);
        block.set_nonce(nonce);
        let rehashed = block.calculate_hash(&Sha256);
        block.set_hash(rehashed);

        assert!(chain.is_valid());

        let mut config = *chain.config();
        config.verify_work = true;
        let strict = Chain { config, ..chain };
        assert_eq!(
            strict.validate(),
            Err(IntegrityViolation {
                index: 3,
                kind: ViolationKind::InsufficientWork
            })
        );
    }

    #[test]
    fn genesis_is_exempt_from_work_check() {
        let config = ChainConfig {
            difficulty: Difficulty::new(3).unwrap(),
            strategy: MiningStrategy::Sequential,
            verify_work: true,
        };
        let chain = Chain::with_config(config, Sha256);
        assert!(chain.is_valid());
    }

    #[test]
    fn parallel_chain_with_library_engine() {
        let config = ChainConfig {
            difficulty: Difficulty::new(2).unwrap(),
            strategy: MiningStrategy::Parallel,
            verify_work: true,
        };
        let mut chain = Chain::with_config(config, Sha2Engine);
        chain.add_block("Alice pays Bob 10 BTC");
        chain.add_block("Bob pays Charlie 5 BTC");
        assert_eq!(chain.len(), 3);
        assert!(chain.is_valid());
        // Either engine re-derives the same hashes.
        for block in chain.blocks() {
            assert_eq!(block.calculate_hash(&Sha256), block.hash());
        }
    }
}
