//! Simulated cryptographic material for the mixer demo.
//!
//! Nothing in this crate hashes, commits or proves anything. Every value is a
//! random hex string or number shaped like the real artifact so that flows and
//! records have something to display and store. A real backend would replace
//! each helper with the matching primitive.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// First block number shown while a deposit waits for confirmation.
pub const BASE_BLOCK_NUMBER: u64 = 18_500_000;

/// Size of the simulated pool the note scanner pretends to walk.
pub const BASE_SCAN_POPULATION: u64 = 1_247;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Placeholder {
    Commitment,
    Nullifier,
    Proof,
    Address,
    TxHash,
    Nonce,
}

impl Placeholder {
    /// Number of hex characters after the `0x` prefix.
    pub fn hex_len(self) -> usize {
        match self {
            Placeholder::Commitment | Placeholder::Nullifier | Placeholder::TxHash => 64,
            Placeholder::Proof => 510,
            Placeholder::Address => 40,
            Placeholder::Nonce => 6,
        }
    }

    pub fn generate<R: Rng + ?Sized>(self, rng: &mut R) -> String {
        random_hex(rng, self.hex_len())
    }
}

/// `0x`-prefixed string of `len` random lowercase hex characters.
pub fn random_hex<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    let mut bytes = vec![0u8; (len + 1) / 2];
    rng.fill(bytes.as_mut_slice());
    let mut out = hex::encode(bytes);
    out.truncate(len);
    format!("0x{out}")
}

/// True when `value` is `0x` followed by exactly `len` hex characters.
pub fn is_hex_placeholder(value: &str, len: usize) -> bool {
    value
        .strip_prefix("0x")
        .map(|body| body.len() == len && body.chars().all(|c| c.is_ascii_hexdigit()))
        .unwrap_or(false)
}

pub fn block_number<R: Rng + ?Sized>(rng: &mut R) -> u64 {
    BASE_BLOCK_NUMBER + rng.gen_range(0..1_000)
}

/// Position of a note in the (nonexistent) commitment tree, 1-based.
pub fn tree_position<R: Rng + ?Sized>(rng: &mut R) -> u32 {
    rng.gen_range(1..=1_000)
}

pub fn leaf_index<R: Rng + ?Sized>(rng: &mut R) -> u32 {
    rng.gen_range(1..=100)
}

pub fn scan_population<R: Rng + ?Sized>(rng: &mut R) -> u64 {
    BASE_SCAN_POPULATION + rng.gen_range(0..100)
}

/// Mock wallet balance in ETH, two decimals, in `[1.00, 11.00)`.
pub fn wallet_balance<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!("{:.2}", rng.gen::<f64>() * 10.0 + 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn placeholders_have_expected_shape() {
        let mut rng = StdRng::seed_from_u64(7);
        for kind in [
            Placeholder::Commitment,
            Placeholder::Nullifier,
            Placeholder::Proof,
            Placeholder::Address,
            Placeholder::TxHash,
            Placeholder::Nonce,
        ] {
            let value = kind.generate(&mut rng);
            assert!(is_hex_placeholder(&value, kind.hex_len()), "{kind:?}: {value}");
        }
    }

    #[test]
    fn rejects_malformed_placeholders() {
        assert!(!is_hex_placeholder("abcd", 4));
        assert!(!is_hex_placeholder("0xabc", 4));
        assert!(!is_hex_placeholder("0xzzzz", 4));
        assert!(is_hex_placeholder("0xABcd", 4));
    }

    #[test]
    fn wallet_balance_has_two_decimals() {
        let mut rng = StdRng::seed_from_u64(1);
        let balance = wallet_balance(&mut rng);
        let (_, decimals) = balance.split_once('.').expect("decimal point");
        assert_eq!(decimals.len(), 2);
        let parsed: f64 = balance.parse().unwrap();
        assert!((1.0..=11.0).contains(&parsed));
    }

    proptest! {
        #[test]
        fn display_numbers_stay_in_range(seed in any::<u64>()) {
            let mut rng = StdRng::seed_from_u64(seed);
            let block = block_number(&mut rng);
            prop_assert!((BASE_BLOCK_NUMBER..BASE_BLOCK_NUMBER + 1_000).contains(&block));
            prop_assert!((1..=1_000).contains(&tree_position(&mut rng)));
            prop_assert!((1..=100).contains(&leaf_index(&mut rng)));
            let scanned = scan_population(&mut rng);
            prop_assert!((BASE_SCAN_POPULATION..BASE_SCAN_POPULATION + 100).contains(&scanned));
        }

        #[test]
        fn random_hex_length_matches(len in 0usize..600) {
            let mut rng = StdRng::seed_from_u64(len as u64);
            let value = random_hex(&mut rng, len);
            prop_assert!(is_hex_placeholder(&value, len));
        }
    }
}
