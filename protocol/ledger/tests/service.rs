use ledger::{
    Amount, DepositStatus, InMemoryLedger, LedgerError, LedgerStore, MixerService, NewDeposit,
    NewWithdrawal, Timings, WithdrawalStatus,
};
use std::time::Duration;
use tokio::time::{sleep, Instant};

fn deposit_request() -> NewDeposit {
    NewDeposit {
        amount: Amount::ONE_ETH,
        recipient: "0xabc".into(),
        commitment: "0x123".into(),
    }
}

fn withdrawal_request() -> NewWithdrawal {
    NewWithdrawal {
        amount: Amount::ONE_ETH,
        nullifier_hash: "0xnullifier".into(),
        proof: "0xproof".into(),
        recipient: "0xrecipient".into(),
    }
}

#[tokio::test(start_paused = true)]
async fn deposit_is_pending_then_committed_after_confirmation() {
    let store = InMemoryLedger::new();
    let service = MixerService::new(store.clone(), Timings::default());

    let started = Instant::now();
    let record = service.submit_deposit(deposit_request()).await.unwrap();
    assert!(started.elapsed() >= Duration::from_millis(3_000));
    assert_eq!(record.status, DepositStatus::Pending);

    sleep(Duration::from_millis(4_900)).await;
    assert_eq!(store.deposits().await.unwrap()[0].status, DepositStatus::Pending);

    sleep(Duration::from_millis(200)).await;
    assert_eq!(store.deposits().await.unwrap()[0].status, DepositStatus::Committed);
    assert_eq!(service.balance().await.unwrap(), Amount::ONE_ETH);
}

#[tokio::test(start_paused = true)]
async fn discovery_lists_only_unspent_committed_notes() {
    let store = InMemoryLedger::new();
    let service = MixerService::new(store.clone(), Timings::default());

    let empty = service.discover_notes().await.unwrap();
    assert_eq!(empty.found, 0);
    assert!(empty.notes.is_empty());

    let committed = store.create_deposit(deposit_request()).await.unwrap();
    store
        .update_deposit_status(committed.id, DepositStatus::Committed, None)
        .await
        .unwrap();
    store.create_deposit(deposit_request()).await.unwrap();

    let discovery = service.discover_notes().await.unwrap();
    assert_eq!(discovery.found, 1);
    assert_eq!(discovery.notes[0].id, committed.id);
    assert_eq!(discovery.notes[0].amount, Amount::ONE_ETH);
    assert!((1..=1_000).contains(&discovery.notes[0].position));
}

#[tokio::test(start_paused = true)]
async fn withdrawal_consumes_a_note_and_completes_after_relay() {
    let store = InMemoryLedger::new();
    let service = MixerService::new(store.clone(), Timings::default());
    let deposit = store.create_deposit(deposit_request()).await.unwrap();
    store
        .update_deposit_status(deposit.id, DepositStatus::Committed, None)
        .await
        .unwrap();

    let started = Instant::now();
    let withdrawal = service.submit_withdrawal(withdrawal_request()).await.unwrap();
    let proof_time = started.elapsed();
    assert!(proof_time >= Duration::from_millis(8_000));
    assert!(proof_time <= Duration::from_millis(15_001));
    assert_eq!(withdrawal.status, WithdrawalStatus::Pending);

    let consumed = &store.deposits().await.unwrap()[0];
    assert_eq!(consumed.status, DepositStatus::Withdrawn);
    assert_eq!(consumed.nullifier_hash.as_deref(), Some("0xnullifier"));

    sleep(Duration::from_millis(3_100)).await;
    let stored = &store.withdrawals().await.unwrap()[0];
    assert_eq!(stored.status, WithdrawalStatus::Completed);

    let activity = service.recent_activity().await.unwrap();
    assert_eq!(activity.len(), 2);
}

#[tokio::test]
async fn withdrawal_without_notes_still_records() {
    let store = InMemoryLedger::new();
    let service = MixerService::new(store.clone(), Timings::instant());
    service.submit_withdrawal(withdrawal_request()).await.unwrap();
    assert_eq!(store.withdrawals().await.unwrap().len(), 1);
    assert!(store.deposits().await.unwrap().is_empty());
}

#[tokio::test]
async fn invalid_deposit_skips_the_simulated_delay() {
    let store = InMemoryLedger::new();
    let service = MixerService::new(store.clone(), Timings::default());
    let err = service
        .submit_deposit(NewDeposit {
            commitment: " ".into(),
            ..deposit_request()
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<LedgerError>(),
        Some(LedgerError::InvalidInput(_))
    ));
    assert!(store.deposits().await.unwrap().is_empty());
}

#[test]
fn proof_delay_stays_in_window() {
    let timings = Timings::default();
    let mut rng = rand::thread_rng();
    for _ in 0..100 {
        let delay = timings.proof_delay(&mut rng);
        assert!(delay >= Duration::from_millis(8_000));
        assert!(delay <= Duration::from_millis(15_000));
    }
    assert_eq!(Timings::instant().proof_delay(&mut rng), Duration::ZERO);
}
