use ledger::{Amount, NewWithdrawal};
use std::sync::Arc;
use tokio::time::sleep;
use tracing::{info, warn};
use zk_core::Placeholder;

use super::stage_error;
use crate::backend::MixerBackend;
use crate::controller::{spawn_flow, FlowController, FlowHandle, FlowOutcome, FlowSnapshot, Notice};
use crate::error::FlowError;
use crate::settings::FlowSettings;
use crate::stage::{proof_seconds_remaining, WithdrawStage};

pub fn spawn_withdrawal(
    backend: Arc<dyn MixerBackend>,
    settings: FlowSettings,
) -> FlowHandle<WithdrawStage> {
    let mut initial = FlowSnapshot::new(WithdrawStage::Scanning);
    initial.progress = settings.scan_progress;
    spawn_flow(initial, settings.rng(), move |ctl| {
        run_withdrawal(ctl, backend, settings)
    })
}

pub async fn run_withdrawal(
    ctl: FlowController<WithdrawStage>,
    backend: Arc<dyn MixerBackend>,
    settings: FlowSettings,
) -> FlowOutcome {
    withdraw(ctl, backend.as_ref(), &settings)
        .await
        .unwrap_or_else(|err| stage_error("withdrawal", err))
}

fn failed(description: &str) -> FlowOutcome {
    FlowOutcome::failed(Notice::error("Withdrawal Failed", description))
}

async fn withdraw(
    mut ctl: FlowController<WithdrawStage>,
    backend: &dyn MixerBackend,
    settings: &FlowSettings,
) -> Result<FlowOutcome, FlowError> {
    let scanned = zk_core::scan_population(ctl.rng());
    ctl.update_tokens(|t| t.scanned_deposits = Some(scanned));
    ctl.set_detail(format!("Checking {scanned} deposits"));

    let discovery = match backend.discover_notes().await {
        Ok(discovery) => discovery,
        Err(err) => {
            warn!("note scan failed: {err:#}");
            return Ok(failed("Scanning for notes did not complete."));
        }
    };
    if discovery.found == 0 {
        info!("withdrawal flow found no notes");
        return Ok(FlowOutcome::aborted(Notice::error(
            "No Notes Found",
            "No withdrawable notes were discovered.",
        )));
    }

    let leaf = zk_core::leaf_index(ctl.rng());
    ctl.update_tokens(|t| {
        t.notes_found = Some(discovery.found);
        t.leaf_index = Some(leaf);
    });
    sleep(settings.notes_delay()).await;

    ctl.advance()?;
    let proof_config = settings.proof_progress.starting_at(ctl.progress());
    ctl.run_progress(proof_config, |p| {
        Some(format!("~{}s remaining", proof_seconds_remaining(p)))
    })
    .await;

    ctl.advance()?;
    let nullifier = Placeholder::Nullifier.generate(ctl.rng());
    let proof = Placeholder::Proof.generate(ctl.rng());
    let recipient = Placeholder::Address.generate(ctl.rng());
    ctl.update_tokens(|t| t.nullifier = Some(nullifier.clone()));

    let request = NewWithdrawal {
        amount: Amount::from_gwei(settings.withdraw_amount_gwei),
        nullifier_hash: nullifier,
        proof,
        recipient,
    };
    let record = match backend.submit_withdrawal(request).await {
        Ok(record) => record,
        Err(err) => {
            warn!("withdrawal submission failed: {err:#}");
            return Ok(failed("There was an error processing your withdrawal."));
        }
    };

    ctl.update_tokens(|t| t.record_id = Some(record.id));
    ctl.advance()?;
    info!("withdrawal flow stored record {}", record.id);
    sleep(settings.close_delay()).await;
    Ok(FlowOutcome::completed(Notice::info(
        "Withdrawal Complete",
        "Your withdrawal has been processed anonymously.",
    )))
}
