use async_trait::async_trait;
use chrono::Utc;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;
use uuid::Uuid;

use crate::error::LedgerError;
use crate::types::{
    ActivityItem, Amount, DepositRecord, DepositStatus, NewDeposit, NewWithdrawal, PrivacyMetrics,
    WithdrawalRecord, WithdrawalStatus,
};

/// Most recent records taken from each kind before merging.
pub const RECENT_PER_KIND: usize = 3;
/// Length cap of the merged activity feed.
pub const RECENT_LIMIT: usize = 5;
/// Ceiling applied to the unlinkability score.
pub const MAX_UNLINKABILITY: f64 = 99.998;

/// Metrics shown by the demo before any deposit lands.
pub const SEED_ANONYMITY_SET: u64 = 23;
pub const SEED_UNLINKABILITY: f64 = 95.7;

/// `min(99.998, 100 - 100 / n)` for a non-empty set, `0` otherwise.
pub fn unlinkability_score(anonymity_set_size: u64) -> f64 {
    if anonymity_set_size == 0 {
        return 0.0;
    }
    (100.0 - 100.0 / anonymity_set_size as f64).min(MAX_UNLINKABILITY)
}

/// Committed deposits minus completed withdrawals, floored at zero.
pub fn compute_balance(deposits: &[DepositRecord], withdrawals: &[WithdrawalRecord]) -> Amount {
    let deposited = deposits
        .iter()
        .filter(|d| d.status == DepositStatus::Committed)
        .fold(Amount::ZERO, |acc, d| acc.saturating_add(d.amount));
    let withdrawn = withdrawals
        .iter()
        .filter(|w| w.status == WithdrawalStatus::Completed)
        .fold(Amount::ZERO, |acc, w| acc.saturating_add(w.amount));
    deposited.saturating_sub(withdrawn)
}

/// Newest-first feed built from the latest deposits and withdrawals.
/// Slices are expected in insertion order; ties keep the newer insert first.
pub fn merge_recent_activity(
    deposits: &[DepositRecord],
    withdrawals: &[WithdrawalRecord],
) -> Vec<ActivityItem> {
    let mut activity = latest(deposits.iter().rev().map(ActivityItem::from));
    activity.extend(latest(withdrawals.iter().rev().map(ActivityItem::from)));
    activity.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    activity.truncate(RECENT_LIMIT);
    activity
}

fn latest(items: impl Iterator<Item = ActivityItem>) -> Vec<ActivityItem> {
    let mut items: Vec<ActivityItem> = items.collect();
    items.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    items.truncate(RECENT_PER_KIND);
    items
}

#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Inserts a `pending` deposit and recomputes the privacy metrics.
    async fn create_deposit(&self, deposit: NewDeposit) -> anyhow::Result<DepositRecord>;
    async fn deposits(&self) -> anyhow::Result<Vec<DepositRecord>>;
    async fn update_deposit_status(
        &self,
        id: Uuid,
        status: DepositStatus,
        nullifier_hash: Option<String>,
    ) -> anyhow::Result<DepositRecord>;
    /// Marks the oldest available deposit `withdrawn` under `nullifier_hash`.
    async fn claim_available_deposit(
        &self,
        nullifier_hash: &str,
    ) -> anyhow::Result<Option<DepositRecord>>;
    async fn create_withdrawal(&self, withdrawal: NewWithdrawal) -> anyhow::Result<WithdrawalRecord>;
    async fn withdrawals(&self) -> anyhow::Result<Vec<WithdrawalRecord>>;
    async fn update_withdrawal_status(
        &self,
        id: Uuid,
        status: WithdrawalStatus,
    ) -> anyhow::Result<WithdrawalRecord>;
    async fn privacy_metrics(&self) -> anyhow::Result<PrivacyMetrics>;
    async fn update_privacy_metrics(
        &self,
        anonymity_set_size: u64,
        unlinkability_score: f64,
    ) -> anyhow::Result<()>;
    async fn recent_activity(&self) -> anyhow::Result<Vec<ActivityItem>>;

    async fn available_notes(&self) -> anyhow::Result<Vec<DepositRecord>> {
        Ok(self
            .deposits()
            .await?
            .into_iter()
            .filter(DepositRecord::is_available)
            .collect())
    }

    async fn balance(&self) -> anyhow::Result<Amount> {
        let deposits = self.deposits().await?;
        let withdrawals = self.withdrawals().await?;
        Ok(compute_balance(&deposits, &withdrawals))
    }
}

#[derive(Debug)]
struct LedgerState {
    deposits: Vec<DepositRecord>,
    withdrawals: Vec<WithdrawalRecord>,
    metrics: PrivacyMetrics,
}

impl LedgerState {
    fn deposit_mut(&mut self, id: Uuid) -> Result<&mut DepositRecord, LedgerError> {
        self.deposits
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or(LedgerError::DepositNotFound(id))
    }

    fn refresh_anonymity_set(&mut self) {
        let size = self
            .deposits
            .iter()
            .filter(|d| d.status == DepositStatus::Committed)
            .count() as u64;
        self.set_metrics(size, unlinkability_score(size));
    }

    fn set_metrics(&mut self, anonymity_set_size: u64, unlinkability_score: f64) {
        self.metrics.anonymity_set_size = anonymity_set_size;
        self.metrics.unlinkability_score = unlinkability_score;
        self.metrics.updated_at = Utc::now();
    }
}

/// Process-lifetime store. Clones share the same records.
#[derive(Debug, Clone)]
pub struct InMemoryLedger {
    inner: Arc<Mutex<LedgerState>>,
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::seeded(0, 0.0)
    }

    pub fn seeded(anonymity_set_size: u64, unlinkability_score: f64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(LedgerState {
                deposits: Vec::new(),
                withdrawals: Vec::new(),
                metrics: PrivacyMetrics::new(anonymity_set_size, unlinkability_score),
            })),
        }
    }

    /// Store carrying the metrics the demo displays on first load.
    pub fn with_demo_seed() -> Self {
        Self::seeded(SEED_ANONYMITY_SET, SEED_UNLINKABILITY)
    }

    fn state(&self) -> MutexGuard<'_, LedgerState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedger {
    async fn create_deposit(&self, deposit: NewDeposit) -> anyhow::Result<DepositRecord> {
        deposit.validate()?;
        let record = DepositRecord {
            id: Uuid::new_v4(),
            amount: deposit.amount,
            recipient: deposit.recipient,
            commitment: deposit.commitment,
            nullifier_hash: None,
            status: DepositStatus::Pending,
            created_at: Utc::now(),
        };
        let mut state = self.state();
        state.deposits.push(record.clone());
        state.refresh_anonymity_set();
        debug!("stored deposit {}", record.id);
        Ok(record)
    }

    async fn deposits(&self) -> anyhow::Result<Vec<DepositRecord>> {
        Ok(self.state().deposits.clone())
    }

    async fn update_deposit_status(
        &self,
        id: Uuid,
        status: DepositStatus,
        nullifier_hash: Option<String>,
    ) -> anyhow::Result<DepositRecord> {
        let mut state = self.state();
        let deposit = state.deposit_mut(id)?;
        if !deposit.status.can_become(status) {
            return Err(LedgerError::InvalidTransition {
                from: deposit.status.as_str(),
                to: status.as_str(),
            }
            .into());
        }
        match (status, nullifier_hash) {
            (DepositStatus::Withdrawn, Some(nullifier)) => deposit.nullifier_hash = Some(nullifier),
            (DepositStatus::Withdrawn, None) => {
                return Err(LedgerError::InvalidInput(
                    "withdrawn deposits need a nullifier hash".into(),
                )
                .into())
            }
            (_, Some(_)) => {
                return Err(LedgerError::InvalidInput(format!(
                    "nullifier hash only accompanies withdrawn, not {}",
                    status.as_str()
                ))
                .into())
            }
            (_, None) => {}
        }
        deposit.status = status;
        Ok(deposit.clone())
    }

    async fn claim_available_deposit(
        &self,
        nullifier_hash: &str,
    ) -> anyhow::Result<Option<DepositRecord>> {
        let mut state = self.state();
        let claimed = state.deposits.iter_mut().find(|d| d.is_available()).map(|deposit| {
            deposit.status = DepositStatus::Withdrawn;
            deposit.nullifier_hash = Some(nullifier_hash.to_string());
            deposit.clone()
        });
        Ok(claimed)
    }

    async fn create_withdrawal(&self, withdrawal: NewWithdrawal) -> anyhow::Result<WithdrawalRecord> {
        withdrawal.validate()?;
        let record = WithdrawalRecord {
            id: Uuid::new_v4(),
            amount: withdrawal.amount,
            nullifier_hash: withdrawal.nullifier_hash,
            proof: withdrawal.proof,
            recipient: withdrawal.recipient,
            status: WithdrawalStatus::Pending,
            created_at: Utc::now(),
        };
        self.state().withdrawals.push(record.clone());
        debug!("stored withdrawal {}", record.id);
        Ok(record)
    }

    async fn withdrawals(&self) -> anyhow::Result<Vec<WithdrawalRecord>> {
        Ok(self.state().withdrawals.clone())
    }

    async fn update_withdrawal_status(
        &self,
        id: Uuid,
        status: WithdrawalStatus,
    ) -> anyhow::Result<WithdrawalRecord> {
        let mut state = self.state();
        let withdrawal = state
            .withdrawals
            .iter_mut()
            .find(|w| w.id == id)
            .ok_or(LedgerError::WithdrawalNotFound(id))?;
        if !withdrawal.status.can_become(status) {
            return Err(LedgerError::InvalidTransition {
                from: withdrawal.status.as_str(),
                to: status.as_str(),
            }
            .into());
        }
        withdrawal.status = status;
        Ok(withdrawal.clone())
    }

    async fn privacy_metrics(&self) -> anyhow::Result<PrivacyMetrics> {
        Ok(self.state().metrics.clone())
    }

    async fn update_privacy_metrics(
        &self,
        anonymity_set_size: u64,
        unlinkability_score: f64,
    ) -> anyhow::Result<()> {
        self.state().set_metrics(anonymity_set_size, unlinkability_score);
        Ok(())
    }

    async fn recent_activity(&self) -> anyhow::Result<Vec<ActivityItem>> {
        let state = self.state();
        Ok(merge_recent_activity(&state.deposits, &state.withdrawals))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn empty_set_scores_zero() {
        assert_eq!(unlinkability_score(0), 0.0);
        assert_eq!(unlinkability_score(1), 0.0);
        assert_eq!(unlinkability_score(4), 75.0);
    }

    #[test]
    fn huge_sets_hit_the_ceiling() {
        assert_eq!(unlinkability_score(1_000_000), MAX_UNLINKABILITY);
    }

    proptest! {
        #[test]
        fn score_matches_formula_below_ceiling(n in 1u64..50_000) {
            let expected = 100.0 - 100.0 / n as f64;
            prop_assert!((unlinkability_score(n) - expected).abs() < 1e-9);
        }

        #[test]
        fn score_is_bounded_and_monotonic(n in 1u64..10_000_000) {
            let score = unlinkability_score(n);
            prop_assert!((0.0..100.0).contains(&score));
            prop_assert!(unlinkability_score(n + 1) >= score);
        }
    }
}
