//! In-memory mixer ledger: deposit and withdrawal records, the privacy
//! metrics singleton, and the timed service that confirms records.

pub mod error;
pub mod service;
pub mod store;
pub mod types;

pub use error::{LedgerError, LedgerResult};
pub use service::{MixerService, Timings};
pub use store::{
    compute_balance, merge_recent_activity, unlinkability_score, InMemoryLedger, LedgerStore,
    MAX_UNLINKABILITY, RECENT_LIMIT, RECENT_PER_KIND, SEED_ANONYMITY_SET, SEED_UNLINKABILITY,
};
pub use types::{
    ActivityItem, ActivityKind, Amount, Balance, DepositRecord, DepositStatus, DiscoveredNote,
    NewDeposit, NewWithdrawal, NoteDiscovery, PrivacyLevel, PrivacyMetrics, WithdrawalRecord,
    WithdrawalStatus,
};
