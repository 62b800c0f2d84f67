//! Host ledger collaborator and the narrow accessor the registry reads and
//! writes through.
//!
//! The registry never owns storage. Each invocation hands it an
//! [`InvocationContext`] supplied by the host: world-state `get`/`put` plus the
//! invocation metadata (invoker identity, organization, channel, transaction id
//! and timestamp). [`LedgerAccessor`] narrows that context to the three storage
//! primitives the registry is allowed to use.
//!
//! Hosts must validate every key an invocation read at commit time and discard
//! the invocation when one of them changed. That validation is what makes the
//! registry's check-then-write sequences atomic; [`memory::MemoryLedger`] is the
//! bundled host that provides it.

pub mod memory;

pub use memory::{CommitOutcome, InvocationHeader, LedgerTransaction, MemoryLedger};

use thiserror::Error;

/// Storage-level failures raised by the host ledger.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// Transport or storage fault. Absence of a key is never reported this way.
    #[error("storage fault: {0}")]
    Storage(String),
    /// A key read by the invocation was rewritten by another commit.
    #[error("read of key '{key}' was invalidated by a concurrent commit")]
    Conflict { key: String },
}

impl LedgerError {
    pub fn storage(reason: impl Into<String>) -> Self {
        Self::Storage(reason.into())
    }
}

/// Invocation metadata that the host could not provide.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field} unavailable: {reason}")]
pub struct ContextError {
    pub field: &'static str,
    pub reason: String,
}

impl ContextError {
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// Everything the host exposes to a single invocation.
pub trait InvocationContext {
    /// Committed value for `key`, or `None` when the key is absent.
    fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>, LedgerError>;

    fn put_state(&mut self, key: &str, value: Vec<u8>) -> Result<(), LedgerError>;

    /// Identity of the invoking principal (for example an X.509 subject).
    fn invoker_identity(&self) -> Result<String, ContextError>;

    /// Membership-service provider id of the invoking organization.
    fn invoker_org_id(&self) -> Result<String, ContextError>;

    fn invocation_id(&self) -> &str;

    fn channel_id(&self) -> &str;

    /// Network-agreed transaction time, whole seconds since the Unix epoch.
    fn invocation_timestamp(&self) -> Result<i64, ContextError>;
}

/// Get, put and existence over the invocation's view of world state.
///
/// No caching: every call goes to the host.
pub struct LedgerAccessor<'a, C: ?Sized> {
    ctx: &'a mut C,
}

impl<'a, C> LedgerAccessor<'a, C>
where
    C: InvocationContext + ?Sized,
{
    pub fn new(ctx: &'a mut C) -> Self {
        Self { ctx }
    }

    pub fn get(&self, key: &str) -> Result<Option<Vec<u8>>, LedgerError> {
        self.ctx.get_state(key)
    }

    pub fn put(&mut self, key: &str, value: Vec<u8>) -> Result<(), LedgerError> {
        self.ctx.put_state(key, value)
    }

    /// Same read as [`get`](Self::get), reduced to whether a value was found.
    pub fn exists(&self, key: &str) -> Result<bool, LedgerError> {
        Ok(self.get(key)?.is_some())
    }
}
