use async_trait::async_trait;
use ledger::{
    DepositRecord, LedgerStore, MixerService, NewDeposit, NewWithdrawal, NoteDiscovery,
    WithdrawalRecord,
};

/// The mixer operations a flow drives. Implemented in-process by
/// [`MixerService`] and over HTTP by the CLI.
#[async_trait]
pub trait MixerBackend: Send + Sync {
    async fn submit_deposit(&self, deposit: NewDeposit) -> anyhow::Result<DepositRecord>;
    async fn discover_notes(&self) -> anyhow::Result<NoteDiscovery>;
    async fn submit_withdrawal(&self, withdrawal: NewWithdrawal)
        -> anyhow::Result<WithdrawalRecord>;
}

#[async_trait]
impl<S> MixerBackend for MixerService<S>
where
    S: LedgerStore + Clone + 'static,
{
    async fn submit_deposit(&self, deposit: NewDeposit) -> anyhow::Result<DepositRecord> {
        MixerService::submit_deposit(self, deposit).await
    }

    async fn discover_notes(&self) -> anyhow::Result<NoteDiscovery> {
        MixerService::discover_notes(self).await
    }

    async fn submit_withdrawal(
        &self,
        withdrawal: NewWithdrawal,
    ) -> anyhow::Result<WithdrawalRecord> {
        MixerService::submit_withdrawal(self, withdrawal).await
    }
}
