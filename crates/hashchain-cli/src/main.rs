use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use hashchain_core::{
    Chain, ChainConfig, Difficulty, DigestEngine, MiningStrategy, Sha2Engine, Sha256,
};
use std::io::Read;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

const DEMO_PAYLOADS: [&str; 3] = [
    "Alice pays Bob 10 BTC",
    "Bob pays Charlie 5 BTC",
    "Charlie pays Dave 2 BTC",
];

#[derive(Parser, Debug)]
#[command(name = "hashchain")]
#[command(about = "Build and verify a proof-of-work hash chain in memory")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Mine one block per payload on top of a fresh genesis block, then print the chain
    Run {
        /// Leading zero hex digits each mined hash must carry
        #[arg(long, default_value_t = 3, allow_negative_numbers = true)]
        difficulty: i64,
        /// Search nonces on all cores instead of the calling thread
        #[arg(long)]
        parallel: bool,
        /// Also re-check the difficulty prefix when validating
        #[arg(long)]
        verify_work: bool,
        /// SHA-256 implementation to hash with
        #[arg(long, value_enum, default_value_t = Engine::Native)]
        engine: Engine,
        /// Print the chain as JSON
        #[arg(long)]
        json: bool,
        /// Block payloads; the three demo transfers when omitted
        payloads: Vec<String>,
    },
    /// Print the SHA-256 digest of the input (stdin when no argument is given)
    Digest {
        #[arg(long, value_enum, default_value_t = Engine::Native)]
        engine: Engine,
        input: Option<String>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Engine {
    /// Built-in implementation
    Native,
    /// The `sha2` crate
    Sha2,
}

impl Engine {
    fn build(self) -> Box<dyn DigestEngine> {
        match self {
            Engine::Native => Box::new(Sha256),
            Engine::Sha2 => Box::new(Sha2Engine),
        }
    }
}

fn main() -> Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Run {
            difficulty,
            parallel,
            verify_work,
            engine,
            json,
            payloads,
        } => {
            let config = ChainConfig {
                difficulty: Difficulty::try_from(difficulty)?,
                strategy: if parallel {
                    MiningStrategy::Parallel
                } else {
                    MiningStrategy::Sequential
                },
                verify_work,
            };
            run(config, engine.build(), payloads, json)?;
        }
        Command::Digest { engine, input } => {
            let bytes = match input {
                Some(text) => text.into_bytes(),
                None => {
                    let mut buf = Vec::new();
                    std::io::stdin()
                        .read_to_end(&mut buf)
                        .context("reading stdin")?;
                    buf
                }
            };
            println!("{}", engine.build().digest_hex(&bytes));
        }
    }
    Ok(())
}

fn run(
    config: ChainConfig,
    engine: Box<dyn DigestEngine>,
    payloads: Vec<String>,
    json: bool,
) -> Result<()> {
    let payloads = if payloads.is_empty() {
        DEMO_PAYLOADS.iter().map(|p| p.to_string()).collect()
    } else {
        payloads
    };

    info!(
        "mining {} block(s) at difficulty {} with {}",
        payloads.len(),
        config.difficulty,
        engine.name()
    );
    let mut chain = Chain::with_config(config, engine);
    for payload in payloads {
        chain.add_block(payload);
    }
    let valid = chain.is_valid();

    if json {
        let out = serde_json::json!({
            "difficulty": chain.difficulty(),
            "valid": valid,
            "blocks": chain.blocks(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        for block in chain.blocks() {
            println!("{block}");
        }
        println!(
            "\nBlockchain is {}",
            if valid { "VALID" } else { "INVALID" }
        );
    }
    Ok(())
}
