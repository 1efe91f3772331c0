//! The user-facing flows. Each `spawn_*` starts one task that walks its stage
//! table and reports a [`FlowOutcome`](crate::FlowOutcome) when it is done.

mod deposit;
mod keygen;
mod kyc;
mod wallet;
mod withdraw;

pub use deposit::{run_deposit, spawn_deposit};
pub use keygen::{run_key_generation, spawn_key_generation};
pub use kyc::{run_kyc, spawn_kyc};
pub use wallet::{run_wallet_connection, spawn_wallet_connection};
pub use withdraw::{run_withdrawal, spawn_withdrawal};

use tracing::warn;

use crate::controller::{FlowOutcome, Notice};
use crate::error::FlowError;

/// A stage table error inside a runner is a bug in the runner itself.
fn stage_error(flow: &str, err: FlowError) -> FlowOutcome {
    warn!("{flow} flow stopped: {err}");
    FlowOutcome::failed(Notice::error("Flow Failed", err.to_string()))
}
