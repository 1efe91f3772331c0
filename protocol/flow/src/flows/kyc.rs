use std::sync::Arc;
use tokio::time::sleep;
use tracing::{info, warn};

use super::stage_error;
use crate::controller::{spawn_flow, FlowController, FlowHandle, FlowOutcome, FlowSnapshot, Notice};
use crate::error::FlowError;
use crate::onboarding::{KycForm, OnboardingBackend};
use crate::settings::FlowSettings;
use crate::stage::{kyc_verification_step, KycStage};

pub fn spawn_kyc(
    backend: Arc<dyn OnboardingBackend>,
    settings: FlowSettings,
    form: KycForm,
) -> FlowHandle<KycStage> {
    spawn_flow(
        FlowSnapshot::new(KycStage::Form),
        settings.rng(),
        move |ctl| run_kyc(ctl, backend, settings, form),
    )
}

pub async fn run_kyc(
    ctl: FlowController<KycStage>,
    backend: Arc<dyn OnboardingBackend>,
    settings: FlowSettings,
    form: KycForm,
) -> FlowOutcome {
    match verify(ctl, backend.as_ref(), &settings, &form).await {
        Ok(outcome) => outcome,
        Err(FlowError::InvalidKyc(errors)) => {
            info!("kyc form rejected: {errors}");
            FlowOutcome::failed(Notice::error("Invalid KYC Details", errors.to_string()))
        }
        Err(err) => stage_error("kyc", err),
    }
}

async fn verify(
    mut ctl: FlowController<KycStage>,
    backend: &dyn OnboardingBackend,
    settings: &FlowSettings,
    form: &KycForm,
) -> Result<FlowOutcome, FlowError> {
    form.validate().map_err(FlowError::InvalidKyc)?;

    ctl.advance()?;
    ctl.run_progress(settings.kyc_progress, |p| {
        Some(kyc_verification_step(p).to_string())
    })
    .await;

    if let Err(err) = backend.complete_kyc(form).await {
        warn!("storing kyc details failed: {err:#}");
        ctl.rewind();
        return Ok(FlowOutcome::failed(Notice::error(
            "KYC Failed",
            "Your details could not be verified.",
        )));
    }

    ctl.advance()?;
    sleep(settings.close_delay()).await;
    Ok(FlowOutcome::completed(Notice::info(
        "KYC Verified",
        "Your identity has been verified.",
    )))
}
