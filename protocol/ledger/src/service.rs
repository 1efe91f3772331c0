use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::store::LedgerStore;
use crate::types::{
    ActivityItem, Amount, DepositRecord, DepositStatus, DiscoveredNote, NewDeposit, NewWithdrawal,
    NoteDiscovery, PrivacyMetrics, WithdrawalRecord, WithdrawalStatus,
};

/// Simulated latencies of the mixer backend, in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timings {
    /// Commitment generation before a deposit is stored.
    pub commitment_delay_ms: u64,
    /// Chain confirmation moving a deposit to `committed`.
    pub confirmation_delay_ms: u64,
    /// Note scanning.
    pub scan_delay_ms: u64,
    pub proof_delay_min_ms: u64,
    pub proof_delay_max_ms: u64,
    /// Relayer submission moving a withdrawal to `completed`.
    pub relayer_delay_ms: u64,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            commitment_delay_ms: 3_000,
            confirmation_delay_ms: 5_000,
            scan_delay_ms: 2_000,
            proof_delay_min_ms: 8_000,
            proof_delay_max_ms: 15_000,
            relayer_delay_ms: 3_000,
        }
    }
}

impl Timings {
    pub fn instant() -> Self {
        Self {
            commitment_delay_ms: 0,
            confirmation_delay_ms: 0,
            scan_delay_ms: 0,
            proof_delay_min_ms: 0,
            proof_delay_max_ms: 0,
            relayer_delay_ms: 0,
        }
    }

    pub fn proof_delay<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        let low = self.proof_delay_min_ms.min(self.proof_delay_max_ms);
        let high = self.proof_delay_min_ms.max(self.proof_delay_max_ms);
        Duration::from_millis(rng.gen_range(low..=high))
    }
}

/// Route-level simulation on top of a [`LedgerStore`]: artificial latency
/// plus detached timers that advance record status later.
#[derive(Debug, Clone)]
pub struct MixerService<S> {
    store: S,
    timings: Timings,
}

impl<S> MixerService<S>
where
    S: LedgerStore + Clone + 'static,
{
    pub fn new(store: S, timings: Timings) -> Self {
        Self { store, timings }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn timings(&self) -> &Timings {
        &self.timings
    }

    pub async fn submit_deposit(&self, deposit: NewDeposit) -> anyhow::Result<DepositRecord> {
        deposit.validate()?;
        sleep(Duration::from_millis(self.timings.commitment_delay_ms)).await;
        let record = self.store.create_deposit(deposit).await?;
        info!("deposit {} pending confirmation", record.id);

        let store = self.store.clone();
        let id = record.id;
        let delay = Duration::from_millis(self.timings.confirmation_delay_ms);
        tokio::spawn(async move {
            sleep(delay).await;
            match store.update_deposit_status(id, DepositStatus::Committed, None).await {
                Ok(_) => info!("deposit {} committed", id),
                Err(err) => warn!("failed to commit deposit {}: {err}", id),
            }
        });
        Ok(record)
    }

    pub async fn discover_notes(&self) -> anyhow::Result<NoteDiscovery> {
        sleep(Duration::from_millis(self.timings.scan_delay_ms)).await;
        let available = self.store.available_notes().await?;
        let mut rng = rand::thread_rng();
        let notes: Vec<DiscoveredNote> = available
            .iter()
            .map(|note| DiscoveredNote {
                id: note.id,
                amount: note.amount,
                position: zk_core::tree_position(&mut rng),
            })
            .collect();
        info!("note scan found {} spendable notes", notes.len());
        Ok(NoteDiscovery {
            found: notes.len(),
            notes,
        })
    }

    pub async fn submit_withdrawal(
        &self,
        withdrawal: NewWithdrawal,
    ) -> anyhow::Result<WithdrawalRecord> {
        withdrawal.validate()?;
        let proof_time = self.timings.proof_delay(&mut rand::thread_rng());
        sleep(proof_time).await;

        let nullifier = withdrawal.nullifier_hash.clone();
        let record = self.store.create_withdrawal(withdrawal).await?;
        match self.store.claim_available_deposit(&nullifier).await? {
            Some(deposit) => info!("withdrawal {} consumed deposit {}", record.id, deposit.id),
            None => warn!("withdrawal {} found no committed deposit to consume", record.id),
        }

        let store = self.store.clone();
        let id = record.id;
        let delay = Duration::from_millis(self.timings.relayer_delay_ms);
        tokio::spawn(async move {
            sleep(delay).await;
            match store
                .update_withdrawal_status(id, WithdrawalStatus::Completed)
                .await
            {
                Ok(_) => info!("withdrawal {} relayed", id),
                Err(err) => warn!("failed to complete withdrawal {}: {err}", id),
            }
        });
        Ok(record)
    }

    pub async fn privacy_metrics(&self) -> anyhow::Result<PrivacyMetrics> {
        self.store.privacy_metrics().await
    }

    pub async fn recent_activity(&self) -> anyhow::Result<Vec<ActivityItem>> {
        self.store.recent_activity().await
    }

    pub async fn balance(&self) -> anyhow::Result<Amount> {
        self.store.balance().await
    }
}
