//! In-process versioned ledger with commit-time read-set validation.

use super::{ContextError, InvocationContext, LedgerError};
use chrono::Utc;
use parking_lot::RwLock;
use std::cell::RefCell;
use std::collections::BTreeMap;
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
struct VersionedValue {
    value: Vec<u8>,
    /// Commit height that last wrote the key.
    version: u64,
}

#[derive(Debug, Default)]
struct WorldState {
    entries: BTreeMap<String, VersionedValue>,
    height: u64,
}

/// Versioned key-value store shared by all invocations of one process.
///
/// Invocations run against a [`LedgerTransaction`]: reads see committed state
/// and are recorded with the version they observed, writes are buffered until
/// [`LedgerTransaction::commit`].
#[derive(Debug, Default)]
pub struct MemoryLedger {
    state: RwLock<WorldState>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self, header: InvocationHeader) -> LedgerTransaction<'_> {
        LedgerTransaction {
            ledger: self,
            header,
            read_set: RefCell::new(BTreeMap::new()),
            write_set: BTreeMap::new(),
        }
    }

    pub fn committed(&self, key: &str) -> Option<Vec<u8>> {
        self.state.read().entries.get(key).map(|e| e.value.clone())
    }

    pub fn version(&self, key: &str) -> Option<u64> {
        self.state.read().entries.get(key).map(|e| e.version)
    }

    /// Number of commits that wrote at least one key.
    pub fn height(&self) -> u64 {
        self.state.read().height
    }

    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot(&self) -> BTreeMap<String, Vec<u8>> {
        self.state
            .read()
            .entries
            .iter()
            .map(|(key, entry)| (key.clone(), entry.value.clone()))
            .collect()
    }
}

/// Identity and timing stamped onto one invocation by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationHeader {
    pub creator_id: String,
    pub msp_id: String,
    pub channel_id: String,
    pub tx_id: String,
    pub timestamp_secs: i64,
}

impl InvocationHeader {
    /// Fresh transaction id and the current wall-clock second.
    pub fn now(
        creator_id: impl Into<String>,
        msp_id: impl Into<String>,
        channel_id: impl Into<String>,
    ) -> Self {
        Self {
            creator_id: creator_id.into(),
            msp_id: msp_id.into(),
            channel_id: channel_id.into(),
            tx_id: Uuid::new_v4().to_string(),
            timestamp_secs: Utc::now().timestamp(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitOutcome {
    /// Ledger height after the commit. Unchanged for read-only invocations.
    pub height: u64,
    pub writes: usize,
}

/// One invocation's view of a [`MemoryLedger`].
///
/// Dropping the transaction without committing discards every buffered write.
pub struct LedgerTransaction<'a> {
    ledger: &'a MemoryLedger,
    header: InvocationHeader,
    /// Key -> version observed on first read (`None` when absent).
    read_set: RefCell<BTreeMap<String, Option<u64>>>,
    write_set: BTreeMap<String, Vec<u8>>,
}

impl LedgerTransaction<'_> {
    pub fn header(&self) -> &InvocationHeader {
        &self.header
    }

    pub fn pending_writes(&self) -> usize {
        self.write_set.len()
    }

    /// Validate the read set and apply the write set atomically.
    pub fn commit(self) -> Result<CommitOutcome, LedgerError> {
        let Self {
            ledger,
            header,
            read_set,
            write_set,
        } = self;
        let mut state = ledger.state.write();

        for (key, observed) in read_set.into_inner() {
            let current = state.entries.get(&key).map(|entry| entry.version);
            if current != observed {
                warn!(
                    tx_id = %header.tx_id,
                    key = %key,
                    ?observed,
                    ?current,
                    "read set invalidated, discarding invocation"
                );
                return Err(LedgerError::Conflict { key });
            }
        }

        if write_set.is_empty() {
            return Ok(CommitOutcome {
                height: state.height,
                writes: 0,
            });
        }

        state.height += 1;
        let height = state.height;
        let writes = write_set.len();
        for (key, value) in write_set {
            state.entries.insert(
                key,
                VersionedValue {
                    value,
                    version: height,
                },
            );
        }

        debug!(tx_id = %header.tx_id, height, writes, "write set applied");
        Ok(CommitOutcome { height, writes })
    }
}

impl InvocationContext for LedgerTransaction<'_> {
    fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>, LedgerError> {
        let state = self.ledger.state.read();
        let entry = state.entries.get(key);
        self.read_set
            .borrow_mut()
            .entry(key.to_string())
            .or_insert_with(|| entry.map(|e| e.version));
        Ok(entry.map(|e| e.value.clone()))
    }

    fn put_state(&mut self, key: &str, value: Vec<u8>) -> Result<(), LedgerError> {
        if key.is_empty() {
            return Err(LedgerError::storage("key must not be empty"));
        }
        self.write_set.insert(key.to_string(), value);
        Ok(())
    }

    fn invoker_identity(&self) -> Result<String, ContextError> {
        Ok(self.header.creator_id.clone())
    }

    fn invoker_org_id(&self) -> Result<String, ContextError> {
        Ok(self.header.msp_id.clone())
    }

    fn invocation_id(&self) -> &str {
        &self.header.tx_id
    }

    fn channel_id(&self) -> &str {
        &self.header.channel_id
    }

    fn invocation_timestamp(&self) -> Result<i64, ContextError> {
        Ok(self.header.timestamp_secs)
    }
}
