//! Name-based routing of the five registry entry points.
//!
//! Arguments arrive as positional strings and results leave as JSON, matching
//! how a ledger host invokes contract functions.

use crate::error::RegistryError;
use crate::ledger::InvocationContext;
use crate::registry::AssetRegistry;
use serde::Serialize;
use serde_json::Value;

pub const INIT_LEDGER: &str = "InitLedger";
pub const CREATE_ASSET: &str = "CreateAsset";
pub const READ_ASSET: &str = "ReadAsset";
pub const UPDATE_ASSET: &str = "UpdateAsset";
pub const HAS_ASSET: &str = "HasAsset";

pub const FUNCTIONS: [&str; 5] = [INIT_LEDGER, CREATE_ASSET, READ_ASSET, UPDATE_ASSET, HAS_ASSET];

/// Run `function` with `args` against `ctx`.
///
/// Returns `null` for InitLedger, the receipt for CreateAsset and UpdateAsset,
/// the asset for ReadAsset and a boolean for HasAsset.
pub fn invoke<C>(
    registry: &AssetRegistry,
    ctx: &mut C,
    function: &str,
    args: &[String],
) -> Result<Value, RegistryError>
where
    C: InvocationContext + ?Sized,
{
    match function {
        INIT_LEDGER => {
            expect_args(function, args, 0)?;
            registry.init_ledger(ctx)?;
            Ok(Value::Null)
        }
        CREATE_ASSET => {
            expect_args(function, args, 2)?;
            let receipt = registry.create_asset(ctx, &args[0], &args[1])?;
            to_payload(CREATE_ASSET, &args[0], &receipt)
        }
        READ_ASSET => {
            expect_args(function, args, 1)?;
            let asset = registry.read_asset(ctx, &args[0])?;
            to_payload(READ_ASSET, &args[0], &asset)
        }
        UPDATE_ASSET => {
            expect_args(function, args, 2)?;
            let receipt = registry.update_asset(ctx, &args[0], &args[1])?;
            to_payload(UPDATE_ASSET, &args[0], &receipt)
        }
        HAS_ASSET => {
            expect_args(function, args, 1)?;
            Ok(Value::Bool(registry.has_asset(ctx, &args[0])?))
        }
        other => Err(RegistryError::UnknownFunction(other.to_string())),
    }
}

fn expect_args(function: &str, args: &[String], expected: usize) -> Result<(), RegistryError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(RegistryError::Arity {
            function: function.to_string(),
            expected,
            actual: args.len(),
        })
    }
}

fn to_payload<T: Serialize>(
    op: &'static str,
    id: &str,
    value: &T,
) -> Result<Value, RegistryError> {
    serde_json::to_value(value).map_err(|source| RegistryError::Marshal {
        op,
        id: id.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{InvocationHeader, MemoryLedger};
    use serde_json::json;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn header() -> InvocationHeader {
        InvocationHeader {
            creator_id: "x509::CN=Org1".to_string(),
            msp_id: "Org1MSP".to_string(),
            channel_id: "mychannel".to_string(),
            tx_id: "tx-001".to_string(),
            timestamp_secs: 1_700_000_000,
        }
    }

    #[test]
    fn routes_every_entry_point() {
        let ledger = MemoryLedger::new();
        let registry = AssetRegistry::new();

        let mut txn = ledger.begin(header());
        assert_eq!(invoke(&registry, &mut txn, INIT_LEDGER, &[]).unwrap(), Value::Null);
        let receipt = invoke(&registry, &mut txn, CREATE_ASSET, &args(&["9", "Nova"])).unwrap();
        assert_eq!(receipt["Transaction_Id"], json!("tx-001"));
        txn.commit().unwrap();

        let mut txn = ledger.begin(header());
        assert_eq!(
            invoke(&registry, &mut txn, READ_ASSET, &args(&["9"])).unwrap(),
            json!({"Id": "9", "Owner": "Nova"})
        );
        assert_eq!(
            invoke(&registry, &mut txn, HAS_ASSET, &args(&["10"])).unwrap(),
            json!(false)
        );
        let receipt = invoke(&registry, &mut txn, UPDATE_ASSET, &args(&["9", "Vega"])).unwrap();
        assert_eq!(receipt["Channel_Id"], json!("mychannel"));
    }

    #[test]
    fn rejects_unknown_functions_and_bad_arity() {
        let ledger = MemoryLedger::new();
        let registry = AssetRegistry::new();
        let mut txn = ledger.begin(header());

        let err = invoke(&registry, &mut txn, "DeleteAsset", &args(&["1"])).unwrap_err();
        assert!(matches!(err, RegistryError::UnknownFunction(ref name) if name == "DeleteAsset"));

        let err = invoke(&registry, &mut txn, CREATE_ASSET, &args(&["1"])).unwrap_err();
        assert!(matches!(
            err,
            RegistryError::Arity { expected: 2, actual: 1, .. }
        ));
        assert_eq!(txn.pending_writes(), 0);
    }

    #[test]
    fn function_names_are_case_sensitive() {
        let ledger = MemoryLedger::new();
        let mut txn = ledger.begin(header());
        let err = invoke(&AssetRegistry::new(), &mut txn, "hasasset", &args(&["1"])).unwrap_err();
        assert!(matches!(err, RegistryError::UnknownFunction(_)));
    }
}
