use std::sync::Arc;
use tokio::time::sleep;
use tracing::warn;

use super::stage_error;
use crate::controller::{spawn_flow, FlowController, FlowHandle, FlowOutcome, FlowSnapshot, Notice};
use crate::error::FlowError;
use crate::onboarding::{OnboardingBackend, WalletKind};
use crate::settings::FlowSettings;
use crate::stage::WalletStage;

pub fn spawn_wallet_connection(
    backend: Arc<dyn OnboardingBackend>,
    settings: FlowSettings,
    kind: WalletKind,
) -> FlowHandle<WalletStage> {
    spawn_flow(
        FlowSnapshot::new(WalletStage::Select),
        settings.rng(),
        move |ctl| run_wallet_connection(ctl, backend, settings, kind),
    )
}

pub async fn run_wallet_connection(
    ctl: FlowController<WalletStage>,
    backend: Arc<dyn OnboardingBackend>,
    settings: FlowSettings,
    kind: WalletKind,
) -> FlowOutcome {
    connect(ctl, backend.as_ref(), &settings, kind)
        .await
        .unwrap_or_else(|err| stage_error("wallet", err))
}

async fn connect(
    mut ctl: FlowController<WalletStage>,
    backend: &dyn OnboardingBackend,
    settings: &FlowSettings,
    kind: WalletKind,
) -> Result<FlowOutcome, FlowError> {
    ctl.advance()?;
    ctl.set_detail(format!("Opening {}", kind.display_name()));

    let session = match backend.connect_wallet(kind).await {
        Ok(session) => session,
        Err(err) => {
            warn!("{} connection failed: {err:#}", kind.id());
            ctl.rewind();
            return Ok(FlowOutcome::failed(Notice::error(
                "Connection Failed",
                "Could not connect to your wallet.",
            )));
        }
    };

    ctl.update_tokens(|t| {
        t.wallet_address = Some(session.address.clone());
        t.wallet_balance = Some(session.balance.clone());
    });
    ctl.advance()?;
    sleep(settings.close_delay()).await;
    Ok(FlowOutcome::completed(Notice::info(
        "Wallet Connected",
        format!("{} is connected.", kind.display_name()),
    )))
}
