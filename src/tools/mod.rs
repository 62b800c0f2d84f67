use crate::dispatch::{self, CREATE_ASSET, HAS_ASSET, INIT_LEDGER, READ_ASSET, UPDATE_ASSET};
use crate::error::RegistryError;
use crate::model::{Asset, HasAssetResponse, InitLedgerResponse, InvokeResponse};
use crate::receipt::TransactionReceipt;
use crate::state::AppState;
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;

pub async fn init_ledger(state: Arc<AppState>) -> Result<InitLedgerResponse, RegistryError> {
    let seeded = state.invoke(INIT_LEDGER, |registry, txn| registry.init_ledger(txn))?;
    Ok(InitLedgerResponse { seeded })
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateAssetParams {
    /// Caller-assigned asset id, used verbatim as the ledger key
    pub id: String,
    pub owner: String,
}

pub async fn create_asset(
    state: Arc<AppState>,
    params: CreateAssetParams,
) -> Result<TransactionReceipt, RegistryError> {
    state.invoke(CREATE_ASSET, |registry, txn| {
        registry.create_asset(txn, &params.id, &params.owner)
    })
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ReadAssetParams {
    pub id: String,
}

pub async fn read_asset(
    state: Arc<AppState>,
    params: ReadAssetParams,
) -> Result<Asset, RegistryError> {
    state.invoke(READ_ASSET, |registry, txn| {
        registry.read_asset(txn, &params.id)
    })
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateAssetParams {
    pub id: String,
    /// Replacement owner; the id is never rewritten
    pub owner: String,
}

pub async fn update_asset(
    state: Arc<AppState>,
    params: UpdateAssetParams,
) -> Result<TransactionReceipt, RegistryError> {
    state.invoke(UPDATE_ASSET, |registry, txn| {
        registry.update_asset(txn, &params.id, &params.owner)
    })
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct HasAssetParams {
    pub id: String,
}

pub async fn has_asset(
    state: Arc<AppState>,
    params: HasAssetParams,
) -> Result<HasAssetResponse, RegistryError> {
    let exists = state.invoke(HAS_ASSET, |registry, txn| {
        registry.has_asset(txn, &params.id)
    })?;
    Ok(HasAssetResponse {
        id: params.id,
        exists,
    })
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct InvokeParams {
    /// Entry point name: InitLedger, CreateAsset, ReadAsset, UpdateAsset or HasAsset
    pub function: String,
    /// Positional string arguments
    #[serde(default)]
    pub args: Vec<String>,
}

pub async fn invoke(
    state: Arc<AppState>,
    params: InvokeParams,
) -> Result<InvokeResponse, RegistryError> {
    let InvokeParams { function, args } = params;
    let payload = state.invoke(invocation_label(&function), |registry, txn| {
        dispatch::invoke(registry, txn, &function, &args)
    })?;
    Ok(InvokeResponse { function, payload })
}

/// Name an `invoke` call is logged and counted under. Unknown names share one
/// bucket so client input never becomes a metrics key.
fn invocation_label(function: &str) -> &'static str {
    dispatch::FUNCTIONS
        .iter()
        .copied()
        .find(|known| *known == function)
        .unwrap_or(INVOKE_UNKNOWN)
}

const INVOKE_UNKNOWN: &str = "invoke";
