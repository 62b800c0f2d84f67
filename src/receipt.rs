//! Per-invocation transaction receipts.
//!
//! A receipt is derived only from the invocation context: who invoked, on
//! behalf of which organization, on which channel, under which transaction id
//! and at which network-agreed second. It is returned to the caller and never
//! written back to the ledger.

use crate::error::RegistryError;
use crate::ledger::{ContextError, InvocationContext};
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TransactionReceipt {
    #[serde(rename = "Transaction_Creator")]
    pub creator: String,
    /// Transaction time in UTC, whole seconds.
    #[serde(rename = "Transaction_Timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "Transaction_Id")]
    pub transaction_id: String,
    /// Membership-service provider id of the invoking organization.
    #[serde(rename = "Client_Id")]
    pub client_id: String,
    #[serde(rename = "Channel_Id")]
    pub channel_id: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReceiptBuilder;

impl ReceiptBuilder {
    /// Assemble a receipt from the current invocation.
    ///
    /// Identity and organization lookups fail as [`RegistryError::Identity`];
    /// a missing timestamp propagates as [`RegistryError::Context`].
    pub fn build<C>(ctx: &C) -> Result<TransactionReceipt, RegistryError>
    where
        C: InvocationContext + ?Sized,
    {
        let creator = ctx
            .invoker_identity()
            .map_err(|source| RegistryError::Identity {
                field: "creator",
                source,
            })?;

        let seconds = ctx.invocation_timestamp()?;
        let timestamp = DateTime::from_timestamp(seconds, 0).ok_or_else(|| {
            ContextError::new("timestamp", format!("{seconds}s is outside the UTC range"))
        })?;

        let transaction_id = ctx.invocation_id().to_string();

        let client_id = ctx
            .invoker_org_id()
            .map_err(|source| RegistryError::Identity {
                field: "client",
                source,
            })?;

        let channel_id = ctx.channel_id().to_string();

        Ok(TransactionReceipt {
            creator,
            timestamp,
            transaction_id,
            client_id,
            channel_id,
        })
    }
}
