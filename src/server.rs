use crate::error::{ERROR_METRICS, ErrorCode, to_rmcp_error};
use crate::logging::mcp_tool_span;
use crate::model::{Asset, HasAssetResponse, InitLedgerResponse, InvokeResponse};
use crate::receipt::TransactionReceipt;
use crate::state::AppState;
use crate::tools;
use anyhow::Result;
use rmcp::{
    ErrorData as McpError, Json, ServerHandler, ServiceExt,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{Implementation, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
    transport::stdio,
};
use std::sync::Arc;
use tracing::Instrument;

const INSTRUCTIONS: &str = "\
Asset registry: a ledger of assets keyed by caller-assigned id, each with one owner.

WORKFLOW:
1) init_ledger once to seed the sample assets (ids \"1\" and \"2\")
2) has_asset before create_asset when unsure whether an id is taken
3) create_asset / update_asset return a transaction receipt (creator, timestamp, tx id, client, channel)
4) read_asset returns {Id, Owner}

RULES:
- Ids and owners are opaque strings, compared byte-for-byte.
- create_asset fails if the id exists; update_asset fails if it does not.
- Each call is one transaction: a failed call writes nothing.
- Commit conflicts are retryable; resubmit the whole call.

invoke runs any entry point by name (InitLedger, CreateAsset, ReadAsset, UpdateAsset, HasAsset) \
with positional string args.";

#[derive(Clone)]
pub struct RegistryServer {
    state: Arc<AppState>,
    tool_router: ToolRouter<RegistryServer>,
}

impl RegistryServer {
    pub fn from_state(state: Arc<AppState>) -> Self {
        Self {
            state,
            tool_router: Self::tool_router(),
        }
    }

    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    pub async fn run_stdio(self) -> Result<()> {
        let service = self
            .serve(stdio())
            .await
            .inspect_err(|error| tracing::error!("serving error: {:?}", error))?;
        service.waiting().await?;
        Ok(())
    }

    fn ensure_tool_enabled(&self, tool: &str) -> Result<(), McpError> {
        tracing::info!(tool = tool, "tool invocation requested");
        if self.state.config().is_tool_enabled(tool) {
            return Ok(());
        }
        let code = ErrorCode::ToolDisabled;
        ERROR_METRICS.record_error(code, Some(tool));
        Err(McpError::invalid_request(
            format!("tool '{tool}' is disabled by server configuration"),
            Some(serde_json::json!({
                "code": code.code(),
                "category": code.category(),
                "retryable": false,
            })),
        ))
    }
}

#[tool_router]
impl RegistryServer {
    #[tool(
        name = "init_ledger",
        description = "Seed the ledger with the sample assets, overwriting ids \"1\" and \"2\""
    )]
    pub async fn init_ledger(&self) -> Result<Json<InitLedgerResponse>, McpError> {
        self.ensure_tool_enabled("init_ledger")?;
        tools::init_ledger(self.state.clone())
            .instrument(mcp_tool_span("init_ledger"))
            .await
            .map(Json)
            .map_err(|e| to_rmcp_error(&e))
    }

    #[tool(
        name = "create_asset",
        description = "Create an asset under a new id and return the transaction receipt"
    )]
    pub async fn create_asset(
        &self,
        Parameters(params): Parameters<tools::CreateAssetParams>,
    ) -> Result<Json<TransactionReceipt>, McpError> {
        self.ensure_tool_enabled("create_asset")?;
        tools::create_asset(self.state.clone(), params)
            .instrument(mcp_tool_span("create_asset"))
            .await
            .map(Json)
            .map_err(|e| to_rmcp_error(&e))
    }

    #[tool(name = "read_asset", description = "Read the asset stored under an id")]
    pub async fn read_asset(
        &self,
        Parameters(params): Parameters<tools::ReadAssetParams>,
    ) -> Result<Json<Asset>, McpError> {
        self.ensure_tool_enabled("read_asset")?;
        tools::read_asset(self.state.clone(), params)
            .instrument(mcp_tool_span("read_asset"))
            .await
            .map(Json)
            .map_err(|e| to_rmcp_error(&e))
    }

    #[tool(
        name = "update_asset",
        description = "Replace the owner of an existing asset and return the transaction receipt"
    )]
    pub async fn update_asset(
        &self,
        Parameters(params): Parameters<tools::UpdateAssetParams>,
    ) -> Result<Json<TransactionReceipt>, McpError> {
        self.ensure_tool_enabled("update_asset")?;
        tools::update_asset(self.state.clone(), params)
            .instrument(mcp_tool_span("update_asset"))
            .await
            .map(Json)
            .map_err(|e| to_rmcp_error(&e))
    }

    #[tool(name = "has_asset", description = "Report whether an id has a stored asset")]
    pub async fn has_asset(
        &self,
        Parameters(params): Parameters<tools::HasAssetParams>,
    ) -> Result<Json<HasAssetResponse>, McpError> {
        self.ensure_tool_enabled("has_asset")?;
        tools::has_asset(self.state.clone(), params)
            .instrument(mcp_tool_span("has_asset"))
            .await
            .map(Json)
            .map_err(|e| to_rmcp_error(&e))
    }

    #[tool(
        name = "invoke",
        description = "Invoke a registry entry point by name with positional string arguments"
    )]
    pub async fn invoke(
        &self,
        Parameters(params): Parameters<tools::InvokeParams>,
    ) -> Result<Json<InvokeResponse>, McpError> {
        self.ensure_tool_enabled("invoke")?;
        tools::invoke(self.state.clone(), params)
            .instrument(mcp_tool_span("invoke"))
            .await
            .map(Json)
            .map_err(|e| to_rmcp_error(&e))
    }
}

#[tool_handler(router = self.tool_router)]
impl ServerHandler for RegistryServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(INSTRUCTIONS.to_string()),
            ..ServerInfo::default()
        }
    }
}
