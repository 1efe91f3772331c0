use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::FlowError;

/// A named step of a simulated flow. `ORDER` is the transition table: each
/// stage moves unconditionally to the one after it and the last is terminal.
pub trait Stage: Copy + Eq + fmt::Debug + Send + Sync + 'static {
    const ORDER: &'static [Self];

    fn label(self) -> &'static str;

    fn initial() -> Self {
        Self::ORDER[0]
    }

    fn position(self) -> usize {
        Self::ORDER.iter().position(|s| *s == self).unwrap_or(0)
    }

    fn next(self) -> Option<Self> {
        Self::ORDER.get(self.position() + 1).copied()
    }

    fn is_terminal(self) -> bool {
        self.next().is_none()
    }
}

pub fn advance<S: Stage>(current: S) -> Result<S, FlowError> {
    current.next().ok_or(FlowError::TerminalStage {
        stage: current.label(),
    })
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Completed,
    Current,
    Pending,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StepLabel {
    pub label: &'static str,
    pub status: StepStatus,
}

/// Every stage of the table, marked relative to `current`.
pub fn step_labels<S: Stage>(current: S) -> Vec<StepLabel> {
    let at = current.position();
    S::ORDER
        .iter()
        .enumerate()
        .map(|(i, stage)| StepLabel {
            label: stage.label(),
            status: match i.cmp(&at) {
                std::cmp::Ordering::Less => StepStatus::Completed,
                std::cmp::Ordering::Equal => StepStatus::Current,
                std::cmp::Ordering::Greater => StepStatus::Pending,
            },
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DepositStage {
    Form,
    Commitment,
    Blockchain,
    Complete,
}

impl Stage for DepositStage {
    const ORDER: &'static [Self] = &[
        DepositStage::Form,
        DepositStage::Commitment,
        DepositStage::Blockchain,
        DepositStage::Complete,
    ];

    fn label(self) -> &'static str {
        match self {
            DepositStage::Form => "Deposit Details",
            DepositStage::Commitment => "Generating Commitment...",
            DepositStage::Blockchain => "Broadcasting Transaction...",
            DepositStage::Complete => "Deposit Complete!",
        }
    }
}

/// Withdrawal stages. Finding no notes while scanning ends the flow instead
/// of advancing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WithdrawStage {
    Scanning,
    ZkProof,
    Relayer,
    Complete,
}

impl Stage for WithdrawStage {
    const ORDER: &'static [Self] = &[
        WithdrawStage::Scanning,
        WithdrawStage::ZkProof,
        WithdrawStage::Relayer,
        WithdrawStage::Complete,
    ];

    fn label(self) -> &'static str {
        match self {
            WithdrawStage::Scanning => "Scanning for Notes",
            WithdrawStage::ZkProof => "Generating Zero-Knowledge Proof",
            WithdrawStage::Relayer => "Submitting via Relayer...",
            WithdrawStage::Complete => "Withdrawal Complete!",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum KeyGenStage {
    Explanation,
    Generating,
    Complete,
}

impl Stage for KeyGenStage {
    const ORDER: &'static [Self] = &[
        KeyGenStage::Explanation,
        KeyGenStage::Generating,
        KeyGenStage::Complete,
    ];

    fn label(self) -> &'static str {
        match self {
            KeyGenStage::Explanation => "Generate Privacy Keys",
            KeyGenStage::Generating => "Generating Keys...",
            KeyGenStage::Complete => "Keys Generated",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum KycStage {
    Form,
    Verifying,
    Success,
}

impl Stage for KycStage {
    const ORDER: &'static [Self] = &[KycStage::Form, KycStage::Verifying, KycStage::Success];

    fn label(self) -> &'static str {
        match self {
            KycStage::Form => "KYC Details",
            KycStage::Verifying => "Verifying Identity",
            KycStage::Success => "KYC Verified",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WalletStage {
    Select,
    Connecting,
    Connected,
}

impl Stage for WalletStage {
    const ORDER: &'static [Self] = &[
        WalletStage::Select,
        WalletStage::Connecting,
        WalletStage::Connected,
    ];

    fn label(self) -> &'static str {
        match self {
            WalletStage::Select => "Connect Your Wallet",
            WalletStage::Connecting => "Connecting...",
            WalletStage::Connected => "Wallet Connected",
        }
    }
}

/// Sub-step shown while keys are generated, derived from progress alone.
pub fn key_generation_step(progress: f64) -> (&'static str, StepStatus) {
    if progress < 25.0 {
        ("Random Entropy Generated", StepStatus::Completed)
    } else if progress < 50.0 {
        ("Private Key Created", StepStatus::Completed)
    } else if progress < 75.0 {
        ("Public Key Deriving...", StepStatus::Current)
    } else {
        ("Secure Storage", StepStatus::Pending)
    }
}

pub fn kyc_verification_step(progress: f64) -> &'static str {
    if progress < 25.0 {
        "Connecting to DigiLocker..."
    } else if progress < 50.0 {
        "Verifying Aadhaar details..."
    } else if progress < 75.0 {
        "Validating PAN information..."
    } else {
        "Finalizing KYC verification..."
    }
}

/// Seconds shown as remaining while the proof is generated.
pub fn proof_seconds_remaining(progress: f64) -> u64 {
    seconds_remaining(progress, 10.0)
}

pub fn key_generation_seconds_remaining(progress: f64) -> u64 {
    seconds_remaining(progress, 30.0)
}

fn seconds_remaining(progress: f64, rate: f64) -> u64 {
    (((100.0 - progress) / rate).floor().max(1.0)) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_run_forward_to_a_stable_terminal() {
        assert_eq!(DepositStage::initial(), DepositStage::Form);
        assert_eq!(DepositStage::Form.next(), Some(DepositStage::Commitment));
        assert_eq!(DepositStage::Blockchain.next(), Some(DepositStage::Complete));
        assert!(DepositStage::Complete.is_terminal());
        assert_eq!(WithdrawStage::Scanning.next(), Some(WithdrawStage::ZkProof));
        assert!(WithdrawStage::Complete.is_terminal());
        assert!(KeyGenStage::Complete.is_terminal());
        assert!(KycStage::Success.is_terminal());
        assert_eq!(WalletStage::initial(), WalletStage::Select);
        assert!(!WalletStage::Connecting.is_terminal());
    }

    #[test]
    fn advancing_past_terminal_fails() {
        assert_eq!(advance(KycStage::Form), Ok(KycStage::Verifying));
        assert_eq!(
            advance(KycStage::Success),
            Err(FlowError::TerminalStage {
                stage: "KYC Verified"
            })
        );
    }

    #[test]
    fn step_labels_mark_completed_current_pending() {
        let steps = step_labels(WithdrawStage::ZkProof);
        let statuses: Vec<_> = steps.iter().map(|s| s.status).collect();
        assert_eq!(
            statuses,
            vec![
                StepStatus::Completed,
                StepStatus::Current,
                StepStatus::Pending,
                StepStatus::Pending
            ]
        );
        assert_eq!(steps[1].label, "Generating Zero-Knowledge Proof");
    }

    #[test]
    fn progress_thresholds_pick_sub_steps() {
        assert_eq!(key_generation_step(0.0).0, "Random Entropy Generated");
        assert_eq!(key_generation_step(49.9).0, "Private Key Created");
        assert_eq!(key_generation_step(60.0).1, StepStatus::Current);
        assert_eq!(key_generation_step(100.0).0, "Secure Storage");
        assert_eq!(kyc_verification_step(10.0), "Connecting to DigiLocker...");
        assert_eq!(kyc_verification_step(74.0), "Validating PAN information...");
        assert_eq!(kyc_verification_step(75.0), "Finalizing KYC verification...");
    }

    #[test]
    fn remaining_time_never_drops_below_one_second() {
        assert_eq!(proof_seconds_remaining(45.0), 5);
        assert_eq!(proof_seconds_remaining(99.0), 1);
        assert_eq!(key_generation_seconds_remaining(0.0), 3);
        assert_eq!(key_generation_seconds_remaining(100.0), 1);
    }
}
