use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

const DEFAULT_CHANNEL_ID: &str = "mychannel";
const DEFAULT_CREATOR_ID: &str = "x509::CN=registry-admin";
const DEFAULT_MSP_ID: &str = "Org1MSP";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    #[value(alias = "stream-http", alias = "stream_http")]
    #[serde(alias = "stream-http", alias = "stream_http")]
    Http,
    Stdio,
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportKind::Http => write!(f, "http"),
            TransportKind::Stdio => write!(f, "stdio"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Channel every invocation is stamped with.
    pub channel_id: String,
    /// Identity reported as the invoker of each transaction.
    pub creator_id: String,
    /// Membership-service provider id of the invoking organization.
    pub msp_id: String,
    pub seed_on_start: bool,
    pub enabled_tools: Option<HashSet<String>>,
    pub transport: TransportKind,
    pub http_bind_address: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            channel_id: DEFAULT_CHANNEL_ID.to_string(),
            creator_id: DEFAULT_CREATOR_ID.to_string(),
            msp_id: DEFAULT_MSP_ID.to_string(),
            seed_on_start: false,
            enabled_tools: None,
            transport: TransportKind::Stdio,
            http_bind_address: default_http_bind(),
        }
    }
}

impl ServerConfig {
    pub fn from_args(args: CliArgs) -> Result<Self> {
        let CliArgs {
            config,
            channel: cli_channel,
            creator: cli_creator,
            msp_id: cli_msp_id,
            seed: cli_seed,
            enabled_tools: cli_enabled_tools,
            transport: cli_transport,
            http_bind: cli_http_bind,
        } = args;

        let file_config = if let Some(path) = config.as_ref() {
            load_config_file(path)?
        } else {
            PartialConfig::default()
        };

        let PartialConfig {
            channel_id: file_channel,
            creator_id: file_creator,
            msp_id: file_msp_id,
            seed_on_start: file_seed,
            enabled_tools: file_enabled_tools,
            transport: file_transport,
            http_bind: file_http_bind,
        } = file_config;

        let enabled_tools = cli_enabled_tools
            .or(file_enabled_tools)
            .map(|tools| {
                tools
                    .into_iter()
                    .map(|tool| tool.trim().to_ascii_lowercase())
                    .filter(|tool| !tool.is_empty())
                    .collect::<HashSet<_>>()
            })
            .filter(|set| !set.is_empty());

        Ok(Self {
            channel_id: cli_channel
                .or(file_channel)
                .unwrap_or_else(|| DEFAULT_CHANNEL_ID.to_string()),
            creator_id: cli_creator
                .or(file_creator)
                .unwrap_or_else(|| DEFAULT_CREATOR_ID.to_string()),
            msp_id: cli_msp_id
                .or(file_msp_id)
                .unwrap_or_else(|| DEFAULT_MSP_ID.to_string()),
            seed_on_start: cli_seed || file_seed.unwrap_or(false),
            enabled_tools,
            transport: cli_transport
                .or(file_transport)
                .unwrap_or(TransportKind::Stdio),
            http_bind_address: cli_http_bind
                .or(file_http_bind)
                .unwrap_or_else(default_http_bind),
        })
    }

    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            !self.channel_id.trim().is_empty(),
            "channel id must not be empty"
        );
        anyhow::ensure!(
            !self.creator_id.trim().is_empty(),
            "creator identity must not be empty"
        );
        anyhow::ensure!(!self.msp_id.trim().is_empty(), "msp id must not be empty");
        Ok(())
    }

    pub fn is_tool_enabled(&self, tool: &str) -> bool {
        match &self.enabled_tools {
            Some(set) => set.contains(&tool.to_ascii_lowercase()),
            None => true,
        }
    }
}

fn default_http_bind() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8089))
}

#[derive(Parser, Debug, Default, Clone)]
#[command(name = "asset-registry", about = "Asset registry MCP server", version)]
pub struct CliArgs {
    #[arg(
        long,
        value_name = "FILE",
        help = "Path to a configuration file (YAML or JSON)",
        global = true
    )]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        env = "ASSET_REGISTRY_CHANNEL",
        value_name = "CHANNEL",
        help = "Channel id stamped onto every invocation"
    )]
    pub channel: Option<String>,

    #[arg(
        long,
        env = "ASSET_REGISTRY_CREATOR",
        value_name = "IDENTITY",
        help = "Invoker identity reported in transaction receipts"
    )]
    pub creator: Option<String>,

    #[arg(
        long,
        env = "ASSET_REGISTRY_MSP_ID",
        value_name = "MSP",
        help = "Membership-service provider id of the invoking organization"
    )]
    pub msp_id: Option<String>,

    #[arg(
        long,
        env = "ASSET_REGISTRY_SEED",
        help = "Run InitLedger once before serving"
    )]
    pub seed: bool,

    #[arg(
        long,
        env = "ASSET_REGISTRY_ENABLED_TOOLS",
        value_name = "TOOL",
        value_delimiter = ',',
        help = "Restrict execution to the provided tool names"
    )]
    pub enabled_tools: Option<Vec<String>>,

    #[arg(
        long,
        env = "ASSET_REGISTRY_TRANSPORT",
        value_enum,
        value_name = "TRANSPORT",
        help = "Transport to expose (http or stdio)"
    )]
    pub transport: Option<TransportKind>,

    #[arg(
        long,
        env = "ASSET_REGISTRY_HTTP_BIND",
        value_name = "ADDR",
        help = "HTTP bind address when using http transport"
    )]
    pub http_bind: Option<SocketAddr>,
}

#[derive(Debug, Default, Deserialize)]
struct PartialConfig {
    channel_id: Option<String>,
    creator_id: Option<String>,
    msp_id: Option<String>,
    seed_on_start: Option<bool>,
    enabled_tools: Option<Vec<String>>,
    transport: Option<TransportKind>,
    http_bind: Option<SocketAddr>,
}

fn load_config_file(path: &Path) -> Result<PartialConfig> {
    if !path.exists() {
        anyhow::bail!("config file {:?} does not exist", path);
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {:?}", path))?;
    let ext = path
        .extension()
        .and_then(|os| os.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let parsed = match ext.as_str() {
        "yaml" | "yml" => serde_yaml::from_str(&contents)
            .with_context(|| format!("failed to parse YAML config {:?}", path))?,
        "json" => serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse JSON config {:?}", path))?,
        other => anyhow::bail!("unsupported config extension: {other}"),
    };
    Ok(parsed)
}
