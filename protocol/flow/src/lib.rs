//! Simulated user flows of the zkETHer mixer: progress animation, stage
//! tables and the async runners that drive them against a mixer backend.

pub mod backend;
pub mod controller;
pub mod error;
pub mod flows;
pub mod onboarding;
pub mod progress;
pub mod settings;
pub mod stage;

pub use backend::MixerBackend;
pub use controller::{
    spawn_flow, DisplayTokens, FlowController, FlowExit, FlowHandle, FlowOutcome, FlowSnapshot,
    Notice,
};
pub use error::FlowError;
pub use flows::{
    spawn_deposit, spawn_key_generation, spawn_kyc, spawn_wallet_connection, spawn_withdrawal,
};
pub use onboarding::{
    format_aadhaar, mask_aadhaar, KycErrors, KycForm, OnboardingBackend, OnboardingNavigator,
    OnboardingProfile, OnboardingStep, OnboardingTimings, SimulatedOnboarding, WalletKind,
    WalletSession,
};
pub use progress::{ProgressConfig, ProgressEvent, ProgressSimulator};
pub use settings::FlowSettings;
pub use stage::{
    DepositStage, KeyGenStage, KycStage, Stage, StepLabel, StepStatus, WalletStage, WithdrawStage,
};
