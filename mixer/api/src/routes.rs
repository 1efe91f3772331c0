use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use ledger::{
    ActivityItem, Balance, DepositRecord, LedgerStore, MixerService, NewDeposit, NewWithdrawal,
    NoteDiscovery, PrivacyMetrics, WithdrawalRecord,
};
use tracing::debug;

use crate::error::ApiError;

#[derive(Clone)]
pub struct AppState<S> {
    pub service: MixerService<S>,
}

impl<S> AppState<S> {
    pub fn new(service: MixerService<S>) -> Self {
        Self { service }
    }
}

pub fn app<S>(state: AppState<S>) -> Router
where
    S: LedgerStore + Clone + 'static,
{
    Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .route("/api/privacy-metrics", get(privacy_metrics::<S>))
        .route("/api/activity", get(activity::<S>))
        .route("/api/deposits", post(create_deposit::<S>))
        .route("/api/discover-notes", post(discover_notes::<S>))
        .route("/api/withdrawals", post(create_withdrawal::<S>))
        .route("/api/balance", get(balance::<S>))
        .with_state(state)
}

async fn privacy_metrics<S>(
    State(state): State<AppState<S>>,
) -> Result<Json<PrivacyMetrics>, ApiError>
where
    S: LedgerStore + Clone + 'static,
{
    let metrics = state
        .service
        .privacy_metrics()
        .await
        .map_err(ApiError::internal("Failed to fetch privacy metrics"))?;
    Ok(Json(metrics))
}

async fn activity<S>(State(state): State<AppState<S>>) -> Result<Json<Vec<ActivityItem>>, ApiError>
where
    S: LedgerStore + Clone + 'static,
{
    let items = state
        .service
        .recent_activity()
        .await
        .map_err(ApiError::internal("Failed to fetch activity"))?;
    Ok(Json(items))
}

async fn create_deposit<S>(
    State(state): State<AppState<S>>,
    payload: Result<Json<NewDeposit>, JsonRejection>,
) -> Result<Json<DepositRecord>, ApiError>
where
    S: LedgerStore + Clone + 'static,
{
    let Json(deposit) = payload.map_err(|rejection| {
        debug!("deposit body rejected: {rejection}");
        ApiError::BadRequest("Invalid deposit data")
    })?;
    let record = state
        .service
        .submit_deposit(deposit)
        .await
        .map_err(|err| ApiError::classify(err, "Invalid deposit data", "Failed to create deposit"))?;
    Ok(Json(record))
}

async fn discover_notes<S>(State(state): State<AppState<S>>) -> Result<Json<NoteDiscovery>, ApiError>
where
    S: LedgerStore + Clone + 'static,
{
    let discovery = state
        .service
        .discover_notes()
        .await
        .map_err(ApiError::internal("Failed to discover notes"))?;
    Ok(Json(discovery))
}

async fn create_withdrawal<S>(
    State(state): State<AppState<S>>,
    payload: Result<Json<NewWithdrawal>, JsonRejection>,
) -> Result<Json<WithdrawalRecord>, ApiError>
where
    S: LedgerStore + Clone + 'static,
{
    let Json(withdrawal) = payload.map_err(|rejection| {
        debug!("withdrawal body rejected: {rejection}");
        ApiError::BadRequest("Invalid withdrawal data")
    })?;
    let record = state
        .service
        .submit_withdrawal(withdrawal)
        .await
        .map_err(|err| {
            ApiError::classify(err, "Invalid withdrawal data", "Failed to create withdrawal")
        })?;
    Ok(Json(record))
}

async fn balance<S>(State(state): State<AppState<S>>) -> Result<Json<Balance>, ApiError>
where
    S: LedgerStore + Clone + 'static,
{
    let balance = state
        .service
        .balance()
        .await
        .map_err(ApiError::internal("Failed to calculate balance"))?;
    Ok(Json(Balance { balance }))
}
