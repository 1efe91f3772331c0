use std::sync::Arc;
use tokio::time::sleep;
use tracing::warn;

use super::stage_error;
use crate::controller::{spawn_flow, FlowController, FlowHandle, FlowOutcome, FlowSnapshot, Notice};
use crate::error::FlowError;
use crate::onboarding::OnboardingBackend;
use crate::settings::FlowSettings;
use crate::stage::{key_generation_seconds_remaining, key_generation_step, KeyGenStage};

pub fn spawn_key_generation(
    backend: Arc<dyn OnboardingBackend>,
    settings: FlowSettings,
) -> FlowHandle<KeyGenStage> {
    spawn_flow(
        FlowSnapshot::new(KeyGenStage::Explanation),
        settings.rng(),
        move |ctl| run_key_generation(ctl, backend, settings),
    )
}

pub async fn run_key_generation(
    ctl: FlowController<KeyGenStage>,
    backend: Arc<dyn OnboardingBackend>,
    settings: FlowSettings,
) -> FlowOutcome {
    generate(ctl, backend.as_ref(), &settings)
        .await
        .unwrap_or_else(|err| stage_error("key generation", err))
}

async fn generate(
    mut ctl: FlowController<KeyGenStage>,
    backend: &dyn OnboardingBackend,
    settings: &FlowSettings,
) -> Result<FlowOutcome, FlowError> {
    ctl.advance()?;
    // A key failure drops the animation at once; success still waits for it
    // to saturate.
    let keys = {
        let keys = backend.generate_keys();
        let progress = ctl.run_progress(settings.key_progress, |p| {
            Some(format!(
                "{} (~{}s)",
                key_generation_step(p).0,
                key_generation_seconds_remaining(p)
            ))
        });
        tokio::pin!(keys, progress);
        tokio::select! {
            res = &mut keys => match res {
                Ok(()) => {
                    progress.await;
                    Ok(())
                }
                Err(err) => Err(err),
            },
            _ = &mut progress => keys.await,
        }
    };
    if let Err(err) = keys {
        warn!("key generation failed: {err:#}");
        ctl.rewind();
        return Ok(FlowOutcome::failed(Notice::error(
            "Key Generation Failed",
            "Your privacy keys could not be generated.",
        )));
    }

    ctl.advance()?;
    sleep(settings.close_delay()).await;
    Ok(FlowOutcome::completed(Notice::info(
        "Keys Generated",
        "Your zkETHer privacy keys are ready.",
    )))
}
