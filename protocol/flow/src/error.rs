use thiserror::Error;

use crate::onboarding::KycErrors;

#[derive(Debug, Error, PartialEq)]
pub enum FlowError {
    #[error("stage {stage} is terminal")]
    TerminalStage { stage: &'static str },
    #[error("recipient public key is required")]
    InvalidRecipient,
    #[error("invalid KYC details: {0}")]
    InvalidKyc(KycErrors),
    #[error("cannot {event} from onboarding step {step}")]
    UnexpectedEvent {
        event: &'static str,
        step: &'static str,
    },
}
