use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error, PartialEq)]
pub enum LedgerError {
    #[error("deposit not found: {0}")]
    DepositNotFound(Uuid),
    #[error("withdrawal not found: {0}")]
    WithdrawalNotFound(Uuid),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid status transition from {from} to {to}")]
    InvalidTransition { from: &'static str, to: &'static str },
}

pub type LedgerResult<T> = Result<T, LedgerError>;
