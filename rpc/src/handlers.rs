//! RPC request handlers.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use subledger_engine::{EngineError, SubscriptionEngine};
use subledger_store::AccountRecord;
use subledger_types::{AccountId, Amount, Timestamp};

use crate::error::RpcError;

pub type SharedEngine = Arc<SubscriptionEngine>;

// ── Configuration ────────────────────────────────────────────────────────

#[derive(Serialize, Deserialize)]
pub struct ConfigResponse {
    pub owner: String,
    pub period: String,
    pub period_selector: u8,
    pub period_secs: u64,
    pub period_cost: String,
}

pub async fn get_config(State(engine): State<SharedEngine>) -> Json<ConfigResponse> {
    let config = engine.config();
    Json(ConfigResponse {
        owner: config.owner.to_string(),
        period: config.period.to_string(),
        period_selector: config.period.selector(),
        period_secs: config.period_secs(),
        period_cost: config.period_cost.to_string(),
    })
}

// ── Account ──────────────────────────────────────────────────────────────

#[derive(Serialize, Deserialize)]
pub struct AccountResponse {
    pub account: String,
    pub staked_amount: String,
    pub deposit_timestamp: u64,
    pub active: bool,
    pub status: String,
    pub available_balance: String,
    pub consumed_amount: String,
    pub expires_at: Option<u64>,
    pub evaluated_at: u64,
}

impl AccountResponse {
    fn build(engine: &SubscriptionEngine, account: &AccountId, record: &AccountRecord, now: Timestamp) -> Self {
        let schedule = engine.schedule();
        Self {
            account: account.to_string(),
            staked_amount: record.staked_amount.to_string(),
            deposit_timestamp: record.deposit_timestamp.as_secs(),
            active: schedule.is_active(record, now),
            status: schedule.status(record, now).as_str().to_string(),
            available_balance: schedule.available_balance(record, now).to_string(),
            consumed_amount: schedule.consumed_amount(record, now).to_string(),
            expires_at: schedule.active_until(record).map(|t| t.as_secs()),
            evaluated_at: now.as_secs(),
        }
    }
}

pub async fn get_account(
    State(engine): State<SharedEngine>,
    Path(account): Path<String>,
) -> Result<Json<AccountResponse>, RpcError> {
    let account = parse_account(account)?;
    let now = engine.now();
    let record = engine.account(&account)?;
    Ok(Json(AccountResponse::build(&engine, &account, &record, now)))
}

// ── Mutations ────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ValueRequest {
    pub account: String,
    /// Attached value, as a decimal string in the smallest currency unit.
    pub value: String,
}

#[derive(Deserialize)]
pub struct WithdrawRequest {
    pub account: String,
}

#[derive(Serialize, Deserialize)]
pub struct WithdrawResponse {
    pub account: String,
    pub amount: String,
    pub staked_amount: String,
}

pub async fn create_subscription(
    State(engine): State<SharedEngine>,
    payload: Result<Json<ValueRequest>, JsonRejection>,
) -> Result<Json<AccountResponse>, RpcError> {
    let Json(req) = payload?;
    let account = parse_account(req.account)?;
    let value = parse_value(&req.value)?;
    let now = engine.now();
    let record = run_blocking(&engine, move |engine| {
        engine.create_subscription_at(&account, value, now).map(|r| (account, r))
    })
    .await?;
    Ok(Json(AccountResponse::build(&engine, &record.0, &record.1, now)))
}

pub async fn increase_subscription(
    State(engine): State<SharedEngine>,
    payload: Result<Json<ValueRequest>, JsonRejection>,
) -> Result<Json<AccountResponse>, RpcError> {
    let Json(req) = payload?;
    let account = parse_account(req.account)?;
    let value = parse_value(&req.value)?;
    let now = engine.now();
    let record = run_blocking(&engine, move |engine| {
        engine.increase_subscription_at(&account, value, now).map(|r| (account, r))
    })
    .await?;
    Ok(Json(AccountResponse::build(&engine, &record.0, &record.1, now)))
}

pub async fn withdraw_all(
    State(engine): State<SharedEngine>,
    payload: Result<Json<WithdrawRequest>, JsonRejection>,
) -> Result<Json<WithdrawResponse>, RpcError> {
    let Json(req) = payload?;
    let account = parse_account(req.account)?;
    let now = engine.now();
    let (account, amount, staked) = run_blocking(&engine, move |engine| {
        let amount = engine.withdraw_all_at(&account, now)?;
        let staked = engine.staked_amount(&account)?;
        Ok((account, amount, staked))
    })
    .await?;
    Ok(Json(WithdrawResponse {
        account: account.to_string(),
        amount: amount.to_string(),
        staked_amount: staked.to_string(),
    }))
}

// ── Helpers ──────────────────────────────────────────────────────────────

fn parse_account(raw: String) -> Result<AccountId, RpcError> {
    AccountId::parse(raw).map_err(|e| RpcError::InvalidRequest(e.to_string()))
}

fn parse_value(raw: &str) -> Result<Amount, RpcError> {
    raw.parse::<Amount>()
        .map_err(|e| RpcError::InvalidRequest(e.to_string()))
}

/// Mutations take the account lock and write to the store, so keep them off the
/// async workers.
async fn run_blocking<R, F>(engine: &SharedEngine, f: F) -> Result<R, RpcError>
where
    F: FnOnce(&SubscriptionEngine) -> Result<R, EngineError> + Send + 'static,
    R: Send + 'static,
{
    let engine = Arc::clone(engine);
    tokio::task::spawn_blocking(move || f(&engine))
        .await
        .map_err(|e| RpcError::Server(e.to_string()))?
        .map_err(RpcError::from)
}
