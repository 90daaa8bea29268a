use crate::{Block, Candidate, Difficulty, DigestEngine, Hash, MiningStrategy};
use rayon::prelude::*;
use tracing::{debug, info, warn};

/// Number of leading zero hex digits (nibbles) in a raw digest.
pub fn count_leading_zero_nibbles(hash: &Hash) -> u32 {
    let mut total = 0u32;
    for b in hash {
        if *b == 0 {
            total += 2;
        } else {
            if *b < 0x10 {
                total += 1;
            }
            break;
        }
    }
    total
}

/// True when the hex string starts with at least `difficulty` `'0'` characters.
pub fn has_leading_zero_digits(hash_hex: &str, difficulty: Difficulty) -> bool {
    let want = difficulty.zeros() as usize;
    hash_hex.len() >= want && hash_hex.bytes().take(want).all(|c| c == b'0')
}

/// Runs the search with the chosen strategy and seals the winning block.
pub fn mine_with<D: DigestEngine>(
    candidate: Candidate,
    difficulty: Difficulty,
    strategy: MiningStrategy,
    engine: &D,
) -> Block {
    match strategy {
        MiningStrategy::Sequential => mine_block(candidate, difficulty, engine),
        MiningStrategy::Parallel => mine_block_parallel(candidate, difficulty, engine),
    }
}

/// Mines a block by trying nonce 0, 1, 2, ... until the digest has at least
/// `difficulty` leading zero hex digits. There is no attempt cap.
pub fn mine_block<D: DigestEngine>(
    candidate: Candidate,
    difficulty: Difficulty,
    engine: &D,
) -> Block {
    debug!(
        index = candidate.index(),
        %difficulty,
        engine = engine.name(),
        "mining block"
    );
    let nonce = search(&candidate, difficulty, engine);
    seal_and_report(candidate, nonce, engine)
}

/// Mines a block by searching nonces in parallel. Rayon splits the nonce range across
/// threads and the first qualifying nonce found by any thread wins, so the nonce is not
/// necessarily the smallest one.
pub fn mine_block_parallel<D: DigestEngine>(
    candidate: Candidate,
    difficulty: Difficulty,
    engine: &D,
) -> Block {
    debug!(
        index = candidate.index(),
        %difficulty,
        engine = engine.name(),
        threads = rayon::current_num_threads(),
        "mining block in parallel"
    );
    let prefix = candidate.hash_prefix();
    let target = difficulty.zeros();

    let found = (0u64..u64::MAX).into_par_iter().find_any(|nonce| {
        let mut bytes = prefix.clone();
        bytes.extend_from_slice(nonce.to_string().as_bytes());
        count_leading_zero_nibbles(&engine.digest(&bytes)) >= target
    });

    let nonce = match found {
        Some(nonce) => nonce,
        None => {
            warn!(index = candidate.index(), "nonce space exhausted, wrapping around");
            search(&candidate, difficulty, engine)
        }
    };
    seal_and_report(candidate, nonce, engine)
}

fn search<D: DigestEngine>(candidate: &Candidate, difficulty: Difficulty, engine: &D) -> u64 {
    let prefix = candidate.hash_prefix();
    let target = difficulty.zeros();
    let mut bytes = prefix.clone();
    let mut nonce = 0u64;
    loop {
        bytes.truncate(prefix.len());
        bytes.extend_from_slice(nonce.to_string().as_bytes());
        if count_leading_zero_nibbles(&engine.digest(&bytes)) >= target {
            return nonce;
        }
        nonce = nonce.wrapping_add(1);
    }
}

fn seal_and_report<D: DigestEngine>(candidate: Candidate, nonce: u64, engine: &D) -> Block {
    let block = candidate.seal(nonce, engine);
    info!(
        "Mined block {} with nonce {} and hash {}",
        block.index(),
        nonce,
        block.hash()
    );
    block
}
