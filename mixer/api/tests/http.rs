use async_trait::async_trait;
use ledger::{
    ActivityItem, DepositRecord, DepositStatus, InMemoryLedger, LedgerStore, MixerService,
    NewDeposit, NewWithdrawal, PrivacyMetrics, Timings, WithdrawalRecord, WithdrawalStatus,
};
use mixer_api::{app, AppState};
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::net::TcpListener;
use uuid::Uuid;

async fn serve<S: LedgerStore + Clone + 'static>(store: S) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let service = MixerService::new(store, Timings::instant());
    let router = app(AppState::new(service));
    tokio::spawn(async move { axum::serve(listener, router.into_make_service()).await });
    format!("http://{addr}")
}

async fn get_json(client: &reqwest::Client, url: String) -> Value {
    let res = client.get(url).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    res.json().await.unwrap()
}

fn deposit_body() -> Value {
    json!({ "amount": 1.0, "recipient": "zk_pub_alice", "commitment": "0x01ab" })
}

fn withdrawal_body() -> Value {
    json!({
        "amount": 1.0,
        "nullifierHash": "0xfeed",
        "proof": "0xproof",
        "recipient": "0xbob"
    })
}

/// Background confirmations are spawned with a zero delay; give them a moment.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

#[tokio::test]
async fn healthz_answers_ok() {
    let base = serve(InMemoryLedger::new()).await;
    let body = reqwest::get(format!("{base}/healthz"))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(body, "ok");
}

#[tokio::test]
async fn seeded_metrics_are_served_in_camel_case() {
    let base = serve(InMemoryLedger::with_demo_seed()).await;
    let client = reqwest::Client::new();
    let metrics = get_json(&client, format!("{base}/api/privacy-metrics")).await;
    assert_eq!(metrics["anonymitySetSize"], 23);
    assert_eq!(metrics["unlinkabilityScore"], 95.7);
    assert!(metrics["updatedAt"].is_string());
}

#[tokio::test]
async fn deposit_is_pending_then_committed() {
    let base = serve(InMemoryLedger::new()).await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{base}/api/deposits"))
        .json(&deposit_body())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let record: Value = res.json().await.unwrap();
    assert_eq!(record["status"], "pending");
    assert_eq!(record["amount"], 1.0);
    assert_eq!(record["nullifierHash"], Value::Null);

    settle().await;
    let activity = get_json(&client, format!("{base}/api/activity")).await;
    assert_eq!(activity[0]["type"], "deposit");
    assert_eq!(activity[0]["status"], "committed");
    assert_eq!(activity[0]["id"], record["id"]);

    let balance = get_json(&client, format!("{base}/api/balance")).await;
    assert_eq!(balance, json!({ "balance": 1.0 }));
}

#[tokio::test]
async fn malformed_deposits_get_400() {
    let base = serve(InMemoryLedger::new()).await;
    let client = reqwest::Client::new();

    for body in [
        json!({ "amount": 1.0, "recipient": "zk_pub_alice" }),
        json!({ "amount": "lots", "recipient": "zk_pub_alice", "commitment": "0x01" }),
        json!({ "amount": 0.0, "recipient": "zk_pub_alice", "commitment": "0x01" }),
        json!({ "amount": 1.0, "recipient": "", "commitment": "0x01" }),
    ] {
        let res = client
            .post(format!("{base}/api/deposits"))
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "{body}");
        let error: Value = res.json().await.unwrap();
        assert_eq!(error, json!({ "error": "Invalid deposit data" }));
    }

    let res = client
        .post(format!("{base}/api/deposits"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let activity = get_json(&client, format!("{base}/api/activity")).await;
    assert_eq!(activity, json!([]));
}

#[tokio::test]
async fn malformed_withdrawals_get_400() {
    let base = serve(InMemoryLedger::new()).await;
    let client = reqwest::Client::new();
    let mut body = withdrawal_body();
    body["nullifierHash"] = json!("");

    let res = client
        .post(format!("{base}/api/withdrawals"))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let error: Value = res.json().await.unwrap();
    assert_eq!(error["error"], "Invalid withdrawal data");
}

#[tokio::test]
async fn withdrawal_spends_a_discovered_note() {
    let base = serve(InMemoryLedger::new()).await;
    let client = reqwest::Client::new();

    let discovery: Value = client
        .post(format!("{base}/api/discover-notes"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(discovery, json!({ "found": 0, "notes": [] }));

    client
        .post(format!("{base}/api/deposits"))
        .json(&deposit_body())
        .send()
        .await
        .unwrap();
    settle().await;

    let discovery: Value = client
        .post(format!("{base}/api/discover-notes"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(discovery["found"], 1);
    let position = discovery["notes"][0]["position"].as_u64().unwrap();
    assert!((1..=1_000).contains(&position));

    let res = client
        .post(format!("{base}/api/withdrawals"))
        .json(&withdrawal_body())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let withdrawal: Value = res.json().await.unwrap();
    assert_eq!(withdrawal["status"], "pending");
    settle().await;

    let balance = get_json(&client, format!("{base}/api/balance")).await;
    assert_eq!(balance["balance"], 0.0);

    let activity = get_json(&client, format!("{base}/api/activity")).await;
    let kinds: Vec<_> = activity
        .as_array()
        .unwrap()
        .iter()
        .map(|item| (item["type"].clone(), item["status"].clone()))
        .collect();
    assert!(kinds.contains(&(json!("withdrawal"), json!("completed"))));
    assert!(kinds.contains(&(json!("deposit"), json!("withdrawn"))));

    let discovery: Value = client
        .post(format!("{base}/api/discover-notes"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(discovery["found"], 0);
}

/// A store whose backing database is gone.
#[derive(Clone)]
struct BrokenLedger;

#[async_trait]
impl LedgerStore for BrokenLedger {
    async fn create_deposit(&self, _: NewDeposit) -> anyhow::Result<DepositRecord> {
        anyhow::bail!("connection refused")
    }
    async fn deposits(&self) -> anyhow::Result<Vec<DepositRecord>> {
        anyhow::bail!("connection refused")
    }
    async fn update_deposit_status(
        &self,
        _: Uuid,
        _: DepositStatus,
        _: Option<String>,
    ) -> anyhow::Result<DepositRecord> {
        anyhow::bail!("connection refused")
    }
    async fn claim_available_deposit(&self, _: &str) -> anyhow::Result<Option<DepositRecord>> {
        anyhow::bail!("connection refused")
    }
    async fn create_withdrawal(&self, _: NewWithdrawal) -> anyhow::Result<WithdrawalRecord> {
        anyhow::bail!("connection refused")
    }
    async fn withdrawals(&self) -> anyhow::Result<Vec<WithdrawalRecord>> {
        anyhow::bail!("connection refused")
    }
    async fn update_withdrawal_status(
        &self,
        _: Uuid,
        _: WithdrawalStatus,
    ) -> anyhow::Result<WithdrawalRecord> {
        anyhow::bail!("connection refused")
    }
    async fn privacy_metrics(&self) -> anyhow::Result<PrivacyMetrics> {
        anyhow::bail!("connection refused")
    }
    async fn update_privacy_metrics(&self, _: u64, _: f64) -> anyhow::Result<()> {
        anyhow::bail!("connection refused")
    }
    async fn recent_activity(&self) -> anyhow::Result<Vec<ActivityItem>> {
        anyhow::bail!("connection refused")
    }
}

#[tokio::test]
async fn store_failures_become_500_with_a_route_message() {
    let base = serve(BrokenLedger).await;
    let client = reqwest::Client::new();

    for (path, message) in [
        ("/api/privacy-metrics", "Failed to fetch privacy metrics"),
        ("/api/activity", "Failed to fetch activity"),
        ("/api/balance", "Failed to calculate balance"),
    ] {
        let res = client.get(format!("{base}{path}")).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR, "{path}");
        let body: Value = res.json().await.unwrap();
        assert_eq!(body, json!({ "error": message }));
    }

    let res = client
        .post(format!("{base}/api/deposits"))
        .json(&deposit_body())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "error": "Failed to create deposit" }));
}
