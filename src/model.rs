use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Registry entry keyed by its caller-assigned id.
///
/// Stored on the ledger as `{"Id": ..., "Owner": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct Asset {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "Owner")]
    pub owner: String,
}

impl Asset {
    pub fn new(id: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            owner: owner.into(),
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct InitLedgerResponse {
    /// Ids written by the seed, in write order.
    pub seeded: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct HasAssetResponse {
    pub id: String,
    pub exists: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct InvokeResponse {
    pub function: String,
    /// Entry point result as JSON (`null` for InitLedger).
    pub payload: serde_json::Value,
}
