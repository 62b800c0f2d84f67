//! Error taxonomy for registry invocations
//!
//! This module provides:
//! - `RegistryError`, the error every entry point returns
//! - Stable error codes with categories and retry hints
//! - Error telemetry counters per code, entry point and category
//! - Conversion to MCP error payloads at the tool boundary

use crate::ledger::{ContextError, LedgerError};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

// =============================================================================
// ERROR CODES
// =============================================================================

/// JSON-RPC 2.0 codes plus registry-specific codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum ErrorCode {
    /// The entry point does not exist
    MethodNotFound = -32601,
    /// Wrong number or shape of arguments
    InvalidParams = -32602,
    /// Internal error
    InternalError = -32603,

    /// Asset id has no stored value
    AssetNotFound = -32001,
    /// Asset id already has a stored value
    AssetAlreadyExists = -32002,
    /// Asset could not be encoded or decoded
    MarshalError = -32003,
    /// Ledger read fault
    LedgerReadError = -32004,
    /// Ledger write fault
    LedgerWriteError = -32005,
    /// Invoker identity or organization unavailable
    IdentityUnavailable = -32006,
    /// Other invocation metadata unavailable
    ContextUnavailable = -32007,
    /// Invocation rejected by commit-time validation
    CommitConflict = -32008,
    /// Tool disabled by configuration
    ToolDisabled = -32009,
}

impl ErrorCode {
    pub fn code(&self) -> i32 {
        *self as i32
    }

    /// Whether re-submitting the whole invocation may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorCode::InternalError
                | ErrorCode::LedgerReadError
                | ErrorCode::LedgerWriteError
                | ErrorCode::CommitConflict
        )
    }

    pub fn category(&self) -> &'static str {
        match self {
            ErrorCode::InvalidParams => "client_error",
            ErrorCode::MethodNotFound | ErrorCode::ToolDisabled => "not_found",
            ErrorCode::InternalError => "server_error",
            ErrorCode::AssetNotFound => "resource_not_found",
            ErrorCode::AssetAlreadyExists => "precondition_failed",
            ErrorCode::MarshalError => "codec_error",
            ErrorCode::LedgerReadError | ErrorCode::LedgerWriteError => "io_error",
            ErrorCode::IdentityUnavailable | ErrorCode::ContextUnavailable => "context_error",
            ErrorCode::CommitConflict => "conflict",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self, self.code())
    }
}

// =============================================================================
// REGISTRY ERROR
// =============================================================================

/// Failure of one registry invocation.
///
/// Storage and codec variants name the entry point and the key involved.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("{op}: failed to marshal asset '{id}': {source}")]
    Marshal {
        op: &'static str,
        id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{op}: failed to read asset '{id}' from world state: {source}")]
    Read {
        op: &'static str,
        id: String,
        #[source]
        source: LedgerError,
    },

    #[error("{op}: failed to put asset '{id}' to world state: {source}")]
    Write {
        op: &'static str,
        id: String,
        #[source]
        source: LedgerError,
    },

    #[error("the asset {0} already exists")]
    AlreadyExists(String),

    #[error("the asset {0} does not exist")]
    NotFound(String),

    #[error("failed to get transaction {field}: {source}")]
    Identity {
        field: &'static str,
        #[source]
        source: ContextError,
    },

    #[error(transparent)]
    Context(#[from] ContextError),

    #[error("invocation {tx_id} was not committed: {source}")]
    Commit {
        tx_id: String,
        #[source]
        source: LedgerError,
    },

    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    #[error("function '{function}' expects {expected} argument(s), got {actual}")]
    Arity {
        function: String,
        expected: usize,
        actual: usize,
    },
}

impl RegistryError {
    pub fn code(&self) -> ErrorCode {
        match self {
            RegistryError::Marshal { .. } => ErrorCode::MarshalError,
            RegistryError::Read { .. } => ErrorCode::LedgerReadError,
            RegistryError::Write { .. } => ErrorCode::LedgerWriteError,
            RegistryError::AlreadyExists(_) => ErrorCode::AssetAlreadyExists,
            RegistryError::NotFound(_) => ErrorCode::AssetNotFound,
            RegistryError::Identity { .. } => ErrorCode::IdentityUnavailable,
            RegistryError::Context(_) => ErrorCode::ContextUnavailable,
            RegistryError::Commit { .. } => ErrorCode::CommitConflict,
            RegistryError::UnknownFunction(_) => ErrorCode::MethodNotFound,
            RegistryError::Arity { .. } => ErrorCode::InvalidParams,
        }
    }

    /// Asset id the failure is about, when there is one
    pub fn asset_id(&self) -> Option<&str> {
        match self {
            RegistryError::Marshal { id, .. }
            | RegistryError::Read { id, .. }
            | RegistryError::Write { id, .. }
            | RegistryError::AlreadyExists(id)
            | RegistryError::NotFound(id) => Some(id),
            _ => None,
        }
    }
}

// =============================================================================
// ERROR TELEMETRY
// =============================================================================

/// Error counters by code, entry point and category
#[derive(Debug)]
pub struct ErrorMetrics {
    error_counts: RwLock<HashMap<ErrorCode, AtomicU64>>,
    function_errors: RwLock<HashMap<String, AtomicU64>>,
    category_counts: RwLock<HashMap<&'static str, AtomicU64>>,
}

impl ErrorMetrics {
    pub fn new() -> Self {
        Self {
            error_counts: RwLock::new(HashMap::new()),
            function_errors: RwLock::new(HashMap::new()),
            category_counts: RwLock::new(HashMap::new()),
        }
    }

    pub fn record_error(&self, code: ErrorCode, function: Option<&str>) {
        increment(&self.error_counts, code);
        if let Some(function) = function {
            let map = self.function_errors.read();
            if let Some(counter) = map.get(function) {
                counter.fetch_add(1, Ordering::Relaxed);
            } else {
                drop(map);
                self.function_errors
                    .write()
                    .entry(function.to_string())
                    .or_insert_with(|| AtomicU64::new(0))
                    .fetch_add(1, Ordering::Relaxed);
            }
        }
        increment(&self.category_counts, code.category());

        tracing::debug!(
            error_code = %code,
            function = function,
            category = code.category(),
            "error recorded"
        );
    }

    pub fn get_error_count(&self, code: ErrorCode) -> u64 {
        self.error_counts
            .read()
            .get(&code)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    pub fn get_function_error_count(&self, function: &str) -> u64 {
        self.function_errors
            .read()
            .get(function)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    pub fn get_category_count(&self, category: &str) -> u64 {
        self.category_counts
            .read()
            .get(category)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    pub fn get_stats(&self) -> ErrorStats {
        ErrorStats {
            error_counts: self
                .error_counts
                .read()
                .iter()
                .map(|(code, c)| (*code, c.load(Ordering::Relaxed)))
                .collect(),
            function_errors: self
                .function_errors
                .read()
                .iter()
                .map(|(name, c)| (name.clone(), c.load(Ordering::Relaxed)))
                .collect(),
            category_counts: self
                .category_counts
                .read()
                .iter()
                .map(|(category, c)| (category.to_string(), c.load(Ordering::Relaxed)))
                .collect(),
        }
    }

    pub fn reset(&self) {
        self.error_counts.write().clear();
        self.function_errors.write().clear();
        self.category_counts.write().clear();
    }
}

impl Default for ErrorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn increment<K>(map: &RwLock<HashMap<K, AtomicU64>>, key: K)
where
    K: std::hash::Hash + Eq,
{
    {
        let read = map.read();
        if let Some(counter) = read.get(&key) {
            counter.fetch_add(1, Ordering::Relaxed);
            return;
        }
    }
    map.write()
        .entry(key)
        .or_insert_with(|| AtomicU64::new(0))
        .fetch_add(1, Ordering::Relaxed);
}

/// Error statistics snapshot
#[derive(Debug, Clone, Serialize)]
pub struct ErrorStats {
    pub error_counts: HashMap<ErrorCode, u64>,
    pub function_errors: HashMap<String, u64>,
    pub category_counts: HashMap<String, u64>,
}

/// Global error metrics instance
pub static ERROR_METRICS: once_cell::sync::Lazy<ErrorMetrics> =
    once_cell::sync::Lazy::new(ErrorMetrics::new);

// =============================================================================
// TOOL BOUNDARY
// =============================================================================

/// Convert a registry failure into an MCP error payload
pub fn to_rmcp_error(error: &RegistryError) -> rmcp::ErrorData {
    let code = error.code();
    let data = serde_json::json!({
        "code": code.code(),
        "category": code.category(),
        "retryable": code.is_retryable(),
        "asset_id": error.asset_id(),
    });

    match code {
        ErrorCode::InvalidParams
        | ErrorCode::AssetNotFound
        | ErrorCode::AssetAlreadyExists => {
            rmcp::ErrorData::invalid_params(error.to_string(), Some(data))
        }
        ErrorCode::MethodNotFound => rmcp::ErrorData::new(
            rmcp::model::ErrorCode::METHOD_NOT_FOUND,
            error.to_string(),
            Some(data),
        ),
        _ => rmcp::ErrorData::internal_error(error.to_string(), Some(data)),
    }
}
