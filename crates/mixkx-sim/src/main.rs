//! mixkx simulation binary.
//!
//! Runs a complete pairwise exchange for a chosen slot layout in one process
//! and logs the outcome. Keys are only ever shown as short fingerprints.
//!
//! # Usage
//!
//! ```bash
//! # Three participants with two slots each
//! mixkx-sim --slots 2,2,2 --seed 7
//!
//! # Larger parameter set, single-threaded, with per-pair fingerprints
//! mixkx-sim --slots 4,1,3 --kem ml-kem-1024 --sequential --show-keys
//! ```

use clap::{Parser, ValueEnum};
use mixkx_core::ExchangeConfig;
use mixkx_crypto::{Kem, MlKem768, MlKem1024, SharedKey};
use mixkx_harness::{InvariantRegistry, SessionConfig, SessionOutcome, SimSession};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// KEM parameter set
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum KemChoice {
    /// ML-KEM-768 (FIPS 203, category 3)
    #[value(name = "ml-kem-768")]
    MlKem768,
    /// ML-KEM-1024 (FIPS 203, category 5)
    #[value(name = "ml-kem-1024")]
    MlKem1024,
}

/// Simulated post-quantum pairwise key exchange
#[derive(Parser, Debug)]
#[command(name = "mixkx-sim")]
#[command(about = "Simulate a mixkx pairwise key exchange")]
#[command(version)]
struct Args {
    /// Slots per participant, comma separated
    #[arg(long, value_delimiter = ',', default_values_t = [2, 2, 2])]
    slots: Vec<usize>,

    /// Session seed
    #[arg(long, default_value = "0")]
    seed: u64,

    /// KEM parameter set
    #[arg(long, value_enum, default_value = "ml-kem-768")]
    kem: KemChoice,

    /// Process pairs on the calling thread only
    #[arg(long)]
    sequential: bool,

    /// Smallest pair count worth spreading across threads
    #[arg(long, default_value = "64")]
    min_parallel_pairs: usize,

    /// Log a fingerprint for every pair
    #[arg(long)]
    show_keys: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let config = SessionConfig {
        slot_counts: args.slots,
        seed: args.seed,
        exchange: ExchangeConfig {
            parallel: !args.sequential,
            min_parallel_pairs: args.min_parallel_pairs,
        },
    };

    match args.kem {
        KemChoice::MlKem768 => run::<MlKem768>(config, args.show_keys),
        KemChoice::MlKem1024 => run::<MlKem1024>(config, args.show_keys),
    }
}

fn run<K: Kem>(config: SessionConfig, show_keys: bool) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(kem = K::NAME, slots = ?config.slot_counts, seed = config.seed, "running session");

    let outcome = SimSession::<K>::new(config).run().inspect_err(|err| {
        tracing::error!(%err, "session failed");
    })?;

    if let Err(violations) = InvariantRegistry::standard().check_all(&outcome.snapshot()) {
        for violation in &violations {
            tracing::error!(%violation, "invariant violated");
        }
        return Err(format!("{} invariant violations", violations.len()).into());
    }

    report(&outcome, show_keys);
    Ok(())
}

fn report(outcome: &SessionOutcome, show_keys: bool) {
    tracing::info!(
        participants = outcome.layout.participants(),
        total = outcome.layout.total(),
        stream = outcome.stream_len,
        roster = %hex::encode(&outcome.roster_fingerprint[..8]),
        "session complete"
    );

    for (p, (range, bytes)) in
        outcome.layout.ranges().iter().zip(&outcome.contribution_bytes).enumerate()
    {
        tracing::info!(
            participant = p,
            start = range.start,
            slots = range.count,
            contribution_bytes = bytes,
            "participant"
        );
    }

    if !show_keys {
        return;
    }
    for matrix in &outcome.matrices {
        for (own, row) in matrix.iter_rows() {
            for (peer, key) in row.iter().enumerate().skip(own + 1) {
                tracing::info!(own, peer, key = %fingerprint(key), "pair key");
            }
        }
    }
}

fn fingerprint(key: &SharedKey) -> String {
    hex::encode(key.fingerprint())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_is_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn parses_slot_list() {
        let args = Args::parse_from(["mixkx-sim", "--slots", "3,0,1", "--kem", "ml-kem-1024"]);
        assert_eq!(args.slots, vec![3, 0, 1]);
        assert_eq!(args.kem, KemChoice::MlKem1024);
        assert!(!args.sequential);
    }

    #[test]
    fn defaults() {
        let args = Args::parse_from(["mixkx-sim"]);
        assert_eq!(args.slots, vec![2, 2, 2]);
        assert_eq!(args.seed, 0);
        assert_eq!(args.kem, KemChoice::MlKem768);
        assert_eq!(args.min_parallel_pairs, 64);
    }
}
