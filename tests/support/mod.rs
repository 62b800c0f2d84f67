#![allow(dead_code)]

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use asset_registry::ledger::{ContextError, InvocationContext, InvocationHeader, LedgerError};
use asset_registry::state::AppState;
use asset_registry::{RegistryServer, ServerConfig};

pub const CREATOR: &str = "x509::CN=Org1";
pub const MSP_ID: &str = "Org1MSP";
pub const CHANNEL: &str = "mychannel";
pub const TX_ID: &str = "tx-001";
pub const TIMESTAMP: i64 = 1_700_000_000;

/// Which host lookups should fail.
#[derive(Debug, Clone, Default)]
pub struct Faults {
    pub read: bool,
    pub write: bool,
    pub identity: bool,
    pub org: bool,
    pub timestamp: bool,
}

/// Host stand-in that applies writes immediately and can be told to fail.
#[derive(Debug, Default)]
pub struct ScriptedContext {
    pub store: BTreeMap<String, Vec<u8>>,
    pub faults: Faults,
    /// Keys in the order they were written.
    pub writes: Vec<String>,
}

impl ScriptedContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_asset(mut self, id: &str, owner: &str) -> Self {
        let bytes = format!(r#"{{"Id":"{id}","Owner":"{owner}"}}"#).into_bytes();
        self.store.insert(id.to_string(), bytes);
        self
    }

    pub fn with_faults(mut self, faults: Faults) -> Self {
        self.faults = faults;
        self
    }

    pub fn stored(&self, key: &str) -> Option<&[u8]> {
        self.store.get(key).map(Vec::as_slice)
    }
}

impl InvocationContext for ScriptedContext {
    fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>, LedgerError> {
        if self.faults.read {
            return Err(LedgerError::storage("peer unreachable"));
        }
        Ok(self.store.get(key).cloned())
    }

    fn put_state(&mut self, key: &str, value: Vec<u8>) -> Result<(), LedgerError> {
        if self.faults.write {
            return Err(LedgerError::storage("disk full"));
        }
        self.writes.push(key.to_string());
        self.store.insert(key.to_string(), value);
        Ok(())
    }

    fn invoker_identity(&self) -> Result<String, ContextError> {
        if self.faults.identity {
            return Err(ContextError::new("creator", "no signed proposal"));
        }
        Ok(CREATOR.to_string())
    }

    fn invoker_org_id(&self) -> Result<String, ContextError> {
        if self.faults.org {
            return Err(ContextError::new("msp id", "no signed proposal"));
        }
        Ok(MSP_ID.to_string())
    }

    fn invocation_id(&self) -> &str {
        TX_ID
    }

    fn channel_id(&self) -> &str {
        CHANNEL
    }

    fn invocation_timestamp(&self) -> Result<i64, ContextError> {
        if self.faults.timestamp {
            return Err(ContextError::new("timestamp", "header missing"));
        }
        Ok(TIMESTAMP)
    }
}

pub fn header(tx_id: &str) -> InvocationHeader {
    InvocationHeader {
        creator_id: CREATOR.to_string(),
        msp_id: MSP_ID.to_string(),
        channel_id: CHANNEL.to_string(),
        tx_id: tx_id.to_string(),
        timestamp_secs: TIMESTAMP,
    }
}

pub fn config_with<F>(f: F) -> ServerConfig
where
    F: FnOnce(&mut ServerConfig),
{
    let mut config = ServerConfig {
        creator_id: CREATOR.to_string(),
        msp_id: MSP_ID.to_string(),
        channel_id: CHANNEL.to_string(),
        ..ServerConfig::default()
    };
    f(&mut config);
    config
}

pub fn app_state() -> Arc<AppState> {
    Arc::new(AppState::new(Arc::new(config_with(|_| {}))))
}

pub fn server() -> RegistryServer {
    RegistryServer::from_state(app_state())
}

pub fn server_with_tools(tools: &[&str]) -> RegistryServer {
    let enabled: HashSet<String> = tools.iter().map(|t| t.to_string()).collect();
    let config = config_with(|cfg| cfg.enabled_tools = Some(enabled));
    RegistryServer::from_state(Arc::new(AppState::new(Arc::new(config))))
}
