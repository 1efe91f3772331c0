use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::progress::ProgressConfig;

/// Tuning for the user-facing flows. Loaded from the `flows` section of the
/// mixer config; every field has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowSettings {
    pub deposit_progress: ProgressConfig,
    pub proof_progress: ProgressConfig,
    pub key_progress: ProgressConfig,
    pub kyc_progress: ProgressConfig,
    /// Progress shown once the note scan starts.
    pub scan_progress: f64,
    /// Pause between finding notes and starting the proof.
    pub notes_delay_ms: u64,
    /// How long a terminal screen stays up before the flow reports its exit.
    pub close_delay_ms: u64,
    pub deposit_amount_gwei: u64,
    pub withdraw_amount_gwei: u64,
    /// Fixed RNG seed for reproducible display tokens.
    pub seed: Option<u64>,
}

impl Default for FlowSettings {
    fn default() -> Self {
        Self {
            deposit_progress: ProgressConfig::DEPOSIT_COMMITMENT,
            proof_progress: ProgressConfig::WITHDRAW_PROOF,
            key_progress: ProgressConfig::KEY_GENERATION,
            kyc_progress: ProgressConfig::KYC_VERIFICATION,
            scan_progress: 45.0,
            notes_delay_ms: 1_000,
            close_delay_ms: 2_000,
            deposit_amount_gwei: ledger::Amount::ONE_ETH.gwei(),
            withdraw_amount_gwei: ledger::Amount::ONE_ETH.gwei(),
            seed: None,
        }
    }
}

impl FlowSettings {
    pub fn notes_delay(&self) -> Duration {
        Duration::from_millis(self.notes_delay_ms)
    }

    pub fn close_delay(&self) -> Duration {
        Duration::from_millis(self.close_delay_ms)
    }

    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}
