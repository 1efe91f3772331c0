use ledger::{Amount, NewDeposit};
use std::sync::Arc;
use tokio::time::sleep;
use tracing::{info, warn};
use zk_core::Placeholder;

use super::stage_error;
use crate::backend::MixerBackend;
use crate::controller::{spawn_flow, FlowController, FlowHandle, FlowOutcome, FlowSnapshot, Notice};
use crate::error::FlowError;
use crate::settings::FlowSettings;
use crate::stage::DepositStage;

pub fn spawn_deposit(
    backend: Arc<dyn MixerBackend>,
    settings: FlowSettings,
    recipient: impl Into<String>,
) -> FlowHandle<DepositStage> {
    let recipient = recipient.into();
    spawn_flow(
        FlowSnapshot::new(DepositStage::Form),
        settings.rng(),
        move |ctl| run_deposit(ctl, backend, settings, recipient),
    )
}

pub async fn run_deposit(
    ctl: FlowController<DepositStage>,
    backend: Arc<dyn MixerBackend>,
    settings: FlowSettings,
    recipient: String,
) -> FlowOutcome {
    match deposit(ctl, backend.as_ref(), &settings, recipient.trim()).await {
        Ok(outcome) => outcome,
        Err(FlowError::InvalidRecipient) => FlowOutcome::failed(Notice::error(
            "Invalid Recipient",
            "Please enter a valid zkETHer public key.",
        )),
        Err(err) => stage_error("deposit", err),
    }
}

async fn deposit(
    mut ctl: FlowController<DepositStage>,
    backend: &dyn MixerBackend,
    settings: &FlowSettings,
    recipient: &str,
) -> Result<FlowOutcome, FlowError> {
    if recipient.is_empty() {
        return Err(FlowError::InvalidRecipient);
    }

    ctl.advance()?;
    let nonce = Placeholder::Nonce.generate(ctl.rng());
    ctl.update_tokens(|t| t.nonce = Some(nonce));
    ctl.run_progress(settings.deposit_progress, |_| None).await;

    ctl.advance()?;
    let commitment = Placeholder::Commitment.generate(ctl.rng());
    let tx_hash = Placeholder::TxHash.generate(ctl.rng());
    let block = zk_core::block_number(ctl.rng());
    ctl.update_tokens(|t| {
        t.commitment = Some(commitment.clone());
        t.tx_hash = Some(tx_hash);
        t.block_number = Some(block);
    });

    let request = NewDeposit {
        amount: Amount::from_gwei(settings.deposit_amount_gwei),
        recipient: recipient.to_string(),
        commitment,
    };
    let record = match backend.submit_deposit(request).await {
        Ok(record) => record,
        Err(err) => {
            warn!("deposit submission failed: {err:#}");
            return Ok(FlowOutcome::failed(Notice::error(
                "Deposit Failed",
                "There was an error processing your deposit.",
            )));
        }
    };

    ctl.update_tokens(|t| t.record_id = Some(record.id));
    ctl.advance()?;
    info!("deposit flow stored record {}", record.id);
    sleep(settings.close_delay()).await;
    Ok(FlowOutcome::completed(Notice::info(
        "Deposit Complete",
        "Your deposit has been committed to the mixer.",
    )))
}
