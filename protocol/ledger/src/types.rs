use std::fmt;

use chrono::{DateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::error::{LedgerError, LedgerResult};

/// ETH amount held as integer gwei. Serialized as a JSON number of ETH.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(u64);

impl Amount {
    pub const GWEI_PER_ETH: u64 = 1_000_000_000;
    pub const ZERO: Amount = Amount(0);
    pub const ONE_ETH: Amount = Amount(Self::GWEI_PER_ETH);

    pub const fn from_gwei(gwei: u64) -> Self {
        Self(gwei)
    }

    pub const fn gwei(self) -> u64 {
        self.0
    }

    /// Rounds to the nearest gwei. Rejects negative and non-finite input.
    pub fn from_eth(eth: f64) -> LedgerResult<Self> {
        if !eth.is_finite() || eth < 0.0 {
            return Err(LedgerError::InvalidInput(format!("invalid amount {eth}")));
        }
        let gwei = (eth * Self::GWEI_PER_ETH as f64).round();
        if gwei > u64::MAX as f64 {
            return Err(LedgerError::InvalidInput(format!("amount {eth} out of range")));
        }
        Ok(Self(gwei as u64))
    }

    pub fn as_eth(self) -> f64 {
        self.0 as f64 / Self::GWEI_PER_ETH as f64
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn saturating_add(self, other: Amount) -> Amount {
        Amount(self.0.saturating_add(other.0))
    }

    pub fn saturating_sub(self, other: Amount) -> Amount {
        Amount(self.0.saturating_sub(other.0))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ETH", self.as_eth())
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_eth())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let eth = f64::deserialize(deserializer)?;
        Amount::from_eth(eth).map_err(de::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DepositStatus {
    Pending,
    Committed,
    Withdrawn,
}

impl DepositStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            DepositStatus::Pending => "pending",
            DepositStatus::Committed => "committed",
            DepositStatus::Withdrawn => "withdrawn",
        }
    }

    /// Deposits only ever move forward one step.
    pub fn can_become(self, next: DepositStatus) -> bool {
        matches!(
            (self, next),
            (DepositStatus::Pending, DepositStatus::Committed)
                | (DepositStatus::Committed, DepositStatus::Withdrawn)
        )
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalStatus {
    Pending,
    Completed,
}

impl WithdrawalStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            WithdrawalStatus::Pending => "pending",
            WithdrawalStatus::Completed => "completed",
        }
    }

    pub fn can_become(self, next: WithdrawalStatus) -> bool {
        matches!(
            (self, next),
            (WithdrawalStatus::Pending, WithdrawalStatus::Completed)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DepositRecord {
    pub id: Uuid,
    pub amount: Amount,
    pub recipient: String,
    pub commitment: String,
    pub nullifier_hash: Option<String>,
    pub status: DepositStatus,
    pub created_at: DateTime<Utc>,
}

impl DepositRecord {
    /// Committed and not yet consumed by a withdrawal.
    pub fn is_available(&self) -> bool {
        self.status == DepositStatus::Committed && self.nullifier_hash.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalRecord {
    pub id: Uuid,
    pub amount: Amount,
    pub nullifier_hash: String,
    pub proof: String,
    pub recipient: String,
    pub status: WithdrawalStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PrivacyMetrics {
    pub id: Uuid,
    pub anonymity_set_size: u64,
    pub unlinkability_score: f64,
    pub updated_at: DateTime<Utc>,
}

impl PrivacyMetrics {
    pub fn new(anonymity_set_size: u64, unlinkability_score: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            anonymity_set_size,
            unlinkability_score,
            updated_at: Utc::now(),
        }
    }

    pub fn privacy_level(&self) -> PrivacyLevel {
        match self.anonymity_set_size {
            0 => PrivacyLevel::None,
            1..=99 => PrivacyLevel::Low,
            100..=999 => PrivacyLevel::Medium,
            _ => PrivacyLevel::High,
        }
    }

    /// Chance of tying a withdrawal to its deposit, as a percentage with
    /// three decimals. An empty pool is fully linkable.
    pub fn linkability_percentage(&self) -> String {
        match self.anonymity_set_size {
            0 => "100".to_string(),
            n => format!("{:.3}", 100.0 / n as f64 * 100.0),
        }
    }

    pub fn status_line(&self) -> &'static str {
        if self.anonymity_set_size > 0 {
            "Your withdrawals are unlinkable"
        } else {
            "No privacy yet - be the first to deposit!"
        }
    }
}

/// Coarse privacy band for an anonymity set size.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PrivacyLevel {
    None,
    Low,
    Medium,
    High,
}

impl PrivacyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrivacyLevel::None => "None",
            PrivacyLevel::Low => "Low",
            PrivacyLevel::Medium => "Medium",
            PrivacyLevel::High => "High",
        }
    }
}

impl std::fmt::Display for PrivacyLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Deposit,
    Withdrawal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActivityItem {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

impl ActivityItem {
    /// Feed headline, e.g. "Deposit completed".
    pub fn summary(&self) -> &'static str {
        match (self.kind, self.status.as_str()) {
            (ActivityKind::Deposit, "committed") => "Deposit completed",
            (ActivityKind::Deposit, _) => "Deposit pending",
            (ActivityKind::Withdrawal, "completed") => "Withdrawal completed",
            (ActivityKind::Withdrawal, _) => "Withdrawal pending",
        }
    }
}

impl From<&DepositRecord> for ActivityItem {
    fn from(deposit: &DepositRecord) -> Self {
        Self {
            id: deposit.id,
            kind: ActivityKind::Deposit,
            status: deposit.status.as_str().to_string(),
            timestamp: deposit.created_at,
        }
    }
}

impl From<&WithdrawalRecord> for ActivityItem {
    fn from(withdrawal: &WithdrawalRecord) -> Self {
        Self {
            id: withdrawal.id,
            kind: ActivityKind::Withdrawal,
            status: withdrawal.status.as_str().to_string(),
            timestamp: withdrawal.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewDeposit {
    pub amount: Amount,
    pub recipient: String,
    pub commitment: String,
}

impl NewDeposit {
    pub fn validate(&self) -> LedgerResult<()> {
        ensure_positive(self.amount)?;
        ensure_present("recipient", &self.recipient)?;
        ensure_present("commitment", &self.commitment)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewWithdrawal {
    pub amount: Amount,
    pub nullifier_hash: String,
    pub proof: String,
    pub recipient: String,
}

impl NewWithdrawal {
    pub fn validate(&self) -> LedgerResult<()> {
        ensure_positive(self.amount)?;
        ensure_present("nullifierHash", &self.nullifier_hash)?;
        ensure_present("proof", &self.proof)?;
        ensure_present("recipient", &self.recipient)
    }
}

fn ensure_positive(amount: Amount) -> LedgerResult<()> {
    if amount.is_zero() {
        return Err(LedgerError::InvalidInput("amount must be positive".into()));
    }
    Ok(())
}

fn ensure_present(field: &str, value: &str) -> LedgerResult<()> {
    if value.trim().is_empty() {
        return Err(LedgerError::InvalidInput(format!("{field} is required")));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiscoveredNote {
    pub id: Uuid,
    pub amount: Amount,
    pub position: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NoteDiscovery {
    pub found: usize,
    pub notes: Vec<DiscoveredNote>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Balance {
    pub balance: Amount,
}
