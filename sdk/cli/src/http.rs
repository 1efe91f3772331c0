use anyhow::Context;
use async_trait::async_trait;
use flow::MixerBackend;
use ledger::{
    ActivityItem, Balance, DepositRecord, NewDeposit, NewWithdrawal, NoteDiscovery,
    PrivacyMetrics, WithdrawalRecord,
};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Talks to a running `zkether-api`.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base: String,
}

impl HttpBackend {
    pub fn new(base: &str) -> Self {
        Self {
            client: Client::new(),
            base: base.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub async fn privacy_metrics(&self) -> anyhow::Result<PrivacyMetrics> {
        self.get("/api/privacy-metrics").await
    }

    pub async fn recent_activity(&self) -> anyhow::Result<Vec<ActivityItem>> {
        self.get("/api/activity").await
    }

    pub async fn balance(&self) -> anyhow::Result<Balance> {
        self.get("/api/balance").await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> anyhow::Result<T> {
        let res = self
            .client
            .get(self.url(path))
            .send()
            .await
            .with_context(|| format!("GET {path}"))?;
        decode(path, res).await
    }

    async fn post<B: serde::Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> anyhow::Result<T> {
        let res = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .with_context(|| format!("POST {path}"))?;
        decode(path, res).await
    }
}

async fn decode<T: DeserializeOwned>(path: &str, res: Response) -> anyhow::Result<T> {
    let status = res.status();
    if !status.is_success() {
        let body = res.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|e| e.error)
            .unwrap_or(body);
        anyhow::bail!("{path} returned {status}: {message}");
    }
    res.json()
        .await
        .with_context(|| format!("decoding {path} response"))
}

#[async_trait]
impl MixerBackend for HttpBackend {
    async fn submit_deposit(&self, deposit: NewDeposit) -> anyhow::Result<DepositRecord> {
        self.post("/api/deposits", &deposit).await
    }

    async fn discover_notes(&self) -> anyhow::Result<NoteDiscovery> {
        self.post("/api/discover-notes", &serde_json::json!({})).await
    }

    async fn submit_withdrawal(
        &self,
        withdrawal: NewWithdrawal,
    ) -> anyhow::Result<WithdrawalRecord> {
        self.post("/api/withdrawals", &withdrawal).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger::{Amount, DepositStatus, InMemoryLedger, MixerService, Timings};
    use mixer_api::{app, AppState};
    use tokio::net::TcpListener;

    async fn serve() -> HttpBackend {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let service = MixerService::new(InMemoryLedger::with_demo_seed(), Timings::instant());
        let router = app(AppState::new(service));
        tokio::spawn(async move { axum::serve(listener, router.into_make_service()).await });
        HttpBackend::new(&format!("http://{addr}/"))
    }

    #[tokio::test]
    async fn round_trips_through_the_api() {
        let backend = serve().await;
        let metrics = backend.privacy_metrics().await.unwrap();
        assert_eq!(metrics.anonymity_set_size, 23);

        let record = backend
            .submit_deposit(NewDeposit {
                amount: Amount::ONE_ETH,
                recipient: "zk_pub_carol".into(),
                commitment: "0x0c".into(),
            })
            .await
            .unwrap();
        assert_eq!(record.status, DepositStatus::Pending);
        assert_eq!(record.amount, Amount::ONE_ETH);

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(backend.discover_notes().await.unwrap().found, 1);
        assert_eq!(backend.balance().await.unwrap().balance, Amount::ONE_ETH);
        assert_eq!(backend.recent_activity().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn api_errors_carry_the_server_message() {
        let backend = serve().await;
        let err = backend
            .submit_withdrawal(NewWithdrawal {
                amount: Amount::ONE_ETH,
                nullifier_hash: String::new(),
                proof: "0x01".into(),
                recipient: "0x02".into(),
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Invalid withdrawal data"));
    }
}
