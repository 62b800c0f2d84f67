use crate::config::ServerConfig;
use crate::error::{ERROR_METRICS, RegistryError};
use crate::ledger::{InvocationHeader, LedgerError, LedgerTransaction, MemoryLedger};
use crate::logging::invocation_span;
use crate::registry::AssetRegistry;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{info, warn};

/// Process-wide state shared by every transport session.
pub struct AppState {
    config: Arc<ServerConfig>,
    ledger: MemoryLedger,
    registry: AssetRegistry,
    /// Invocations started, committed or not
    invocations: AtomicU64,
    /// Invocations rejected by commit-time read-set validation
    conflicts: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InvocationStats {
    pub invocations: u64,
    pub conflicts: u64,
    pub height: u64,
    pub keys: usize,
}

impl AppState {
    pub fn new(config: Arc<ServerConfig>) -> Self {
        Self {
            config,
            ledger: MemoryLedger::new(),
            registry: AssetRegistry::new(),
            invocations: AtomicU64::new(0),
            conflicts: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> Arc<ServerConfig> {
        self.config.clone()
    }

    pub fn ledger(&self) -> &MemoryLedger {
        &self.ledger
    }

    pub fn registry(&self) -> &AssetRegistry {
        &self.registry
    }

    /// Header for a new invocation under the configured identity and channel.
    pub fn header(&self) -> InvocationHeader {
        InvocationHeader::now(
            self.config.creator_id.as_str(),
            self.config.msp_id.as_str(),
            self.config.channel_id.as_str(),
        )
    }

    pub fn stats(&self) -> InvocationStats {
        InvocationStats {
            invocations: self.invocations.load(Ordering::Relaxed),
            conflicts: self.conflicts.load(Ordering::Relaxed),
            height: self.ledger.height(),
            keys: self.ledger.len(),
        }
    }

    /// Run one entry point as a single ledger transaction.
    ///
    /// Buffered writes are committed only when `f` succeeds; on any error the
    /// transaction is dropped and nothing reaches the ledger.
    pub fn invoke<T, F>(&self, function: &str, f: F) -> Result<T, RegistryError>
    where
        F: FnOnce(&AssetRegistry, &mut LedgerTransaction<'_>) -> Result<T, RegistryError>,
    {
        self.invoke_with_header(function, self.header(), f)
    }

    pub fn invoke_with_header<T, F>(
        &self,
        function: &str,
        header: InvocationHeader,
        f: F,
    ) -> Result<T, RegistryError>
    where
        F: FnOnce(&AssetRegistry, &mut LedgerTransaction<'_>) -> Result<T, RegistryError>,
    {
        self.invocations.fetch_add(1, Ordering::Relaxed);
        let span = invocation_span(function, &header.tx_id, &header.channel_id);
        let _entered = span.enter();

        let result = self.run(header, f);
        if let Err(error) = &result {
            ERROR_METRICS.record_error(error.code(), Some(function));
            warn!(error = %error, code = %error.code(), "invocation failed");
        }
        result
    }

    fn run<T, F>(&self, header: InvocationHeader, f: F) -> Result<T, RegistryError>
    where
        F: FnOnce(&AssetRegistry, &mut LedgerTransaction<'_>) -> Result<T, RegistryError>,
    {
        let tx_id = header.tx_id.clone();
        let mut txn = self.ledger.begin(header);
        let value = f(&self.registry, &mut txn)?;

        let outcome = txn.commit().map_err(|source| {
            if matches!(source, LedgerError::Conflict { .. }) {
                self.conflicts.fetch_add(1, Ordering::Relaxed);
            }
            RegistryError::Commit {
                tx_id: tx_id.clone(),
                source,
            }
        })?;

        info!(
            tx_id = %tx_id,
            height = outcome.height,
            writes = outcome.writes,
            "invocation committed"
        );
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::InvocationContext;
    use crate::model::Asset;

    fn state() -> AppState {
        AppState::new(Arc::new(ServerConfig::default()))
    }

    #[test]
    fn commits_successful_invocations() {
        let state = state();
        let receipt = state
            .invoke("CreateAsset", |registry, txn| {
                registry.create_asset(txn, "9", "Nova")
            })
            .unwrap();

        assert_eq!(receipt.channel_id, "mychannel");
        assert_eq!(receipt.client_id, "Org1MSP");
        assert_eq!(
            state.ledger().committed("9"),
            Some(Asset::new("9", "Nova").to_bytes().unwrap())
        );
        assert_eq!(state.stats().height, 1);
    }

    #[test]
    fn failed_invocations_leave_no_writes() {
        let state = state();
        let err = state
            .invoke("CreateAsset", |registry, txn| {
                registry.create_asset(txn, "9", "Nova")?;
                Err::<(), _>(RegistryError::NotFound("forced".into()))
            })
            .unwrap_err();

        assert!(matches!(err, RegistryError::NotFound(_)));
        assert!(state.ledger().is_empty());
        assert_eq!(state.stats().invocations, 1);
    }

    #[test]
    fn conflicting_commit_is_counted() {
        let state = state();
        let err = state
            .invoke("CreateAsset", |registry, txn| {
                registry.create_asset(txn, "9", "Nova")?;
                // Another writer lands on the key this invocation read.
                let mut other = state.ledger().begin(state.header());
                other.put_state("9", b"{}".to_vec()).unwrap();
                other.commit().unwrap();
                Ok(())
            })
            .unwrap_err();

        assert!(matches!(
            err,
            RegistryError::Commit {
                source: LedgerError::Conflict { .. },
                ..
            }
        ));
        assert_eq!(state.stats().conflicts, 1);
        assert_eq!(state.ledger().committed("9"), Some(b"{}".to_vec()));
    }
}
