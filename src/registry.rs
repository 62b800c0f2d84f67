//! Asset registry entry points.
//!
//! Every operation touches a single key through the [`LedgerAccessor`] of the
//! invocation it runs in. Existence checks and the writes that depend on them
//! are not locked here; the host discards the whole invocation at commit time
//! if any key it read has changed since.

use crate::error::RegistryError;
use crate::ledger::{InvocationContext, LedgerAccessor, LedgerError};
use crate::model::Asset;
use crate::receipt::{ReceiptBuilder, TransactionReceipt};
use tracing::{debug, warn};

/// Assets written by [`AssetRegistry::init_ledger`], in write order.
pub const SEED_ASSETS: [(&str, &str); 2] = [("1", "Alesso"), ("2", "Coldplay")];

#[derive(Debug, Clone, Copy, Default)]
pub struct AssetRegistry;

impl AssetRegistry {
    pub fn new() -> Self {
        Self
    }

    /// Write the seed assets, overwriting whatever is stored under their ids.
    ///
    /// Stops at the first failing item with a write error, whether the item
    /// failed to encode or to store. Items already written in this
    /// invocation stay buffered; the host commits all or none of them.
    pub fn init_ledger<C>(&self, ctx: &mut C) -> Result<Vec<String>, RegistryError>
    where
        C: InvocationContext + ?Sized,
    {
        const OP: &str = "InitLedger";
        let mut ledger = LedgerAccessor::new(ctx);
        let mut seeded = Vec::with_capacity(SEED_ASSETS.len());

        for (id, owner) in SEED_ASSETS {
            let bytes = encode(OP, &Asset::new(id, owner)).map_err(seed_write_error)?;
            ledger.put(id, bytes).map_err(write_error(OP, id))?;
            seeded.push(id.to_string());
        }

        debug!(count = seeded.len(), "seed assets written");
        Ok(seeded)
    }

    pub fn create_asset<C>(
        &self,
        ctx: &mut C,
        id: &str,
        owner: &str,
    ) -> Result<TransactionReceipt, RegistryError>
    where
        C: InvocationContext + ?Sized,
    {
        const OP: &str = "CreateAsset";
        let mut ledger = LedgerAccessor::new(&mut *ctx);

        if ledger.exists(id).map_err(read_error(OP, id))? {
            warn!(asset_id = id, "create rejected, asset already exists");
            return Err(RegistryError::AlreadyExists(id.to_string()));
        }

        let bytes = encode(OP, &Asset::new(id, owner))?;
        ledger.put(id, bytes).map_err(write_error(OP, id))?;
        debug!(asset_id = id, "asset created");

        ReceiptBuilder::build(&*ctx)
    }

    pub fn read_asset<C>(&self, ctx: &mut C, id: &str) -> Result<Asset, RegistryError>
    where
        C: InvocationContext + ?Sized,
    {
        const OP: &str = "ReadAsset";
        let ledger = LedgerAccessor::new(ctx);

        let bytes = ledger
            .get(id)
            .map_err(read_error(OP, id))?
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;
        decode(OP, id, &bytes)
    }

    /// Replace the owner of an existing asset. The id is never rewritten.
    pub fn update_asset<C>(
        &self,
        ctx: &mut C,
        id: &str,
        owner: &str,
    ) -> Result<TransactionReceipt, RegistryError>
    where
        C: InvocationContext + ?Sized,
    {
        const OP: &str = "UpdateAsset";
        let mut ledger = LedgerAccessor::new(&mut *ctx);

        if !ledger.exists(id).map_err(read_error(OP, id))? {
            warn!(asset_id = id, "update rejected, asset does not exist");
            return Err(RegistryError::NotFound(id.to_string()));
        }

        let bytes = ledger
            .get(id)
            .map_err(read_error(OP, id))?
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;
        let mut asset = decode(OP, id, &bytes)?;
        asset.owner = owner.to_string();

        let bytes = encode(OP, &asset)?;
        ledger.put(id, bytes).map_err(write_error(OP, id))?;
        debug!(asset_id = id, "asset owner updated");

        ReceiptBuilder::build(&*ctx)
    }

    pub fn has_asset<C>(&self, ctx: &mut C, id: &str) -> Result<bool, RegistryError>
    where
        C: InvocationContext + ?Sized,
    {
        LedgerAccessor::new(ctx)
            .exists(id)
            .map_err(read_error("HasAsset", id))
    }
}

fn encode(op: &'static str, asset: &Asset) -> Result<Vec<u8>, RegistryError> {
    asset.to_bytes().map_err(|source| RegistryError::Marshal {
        op,
        id: asset.id.clone(),
        source,
    })
}

fn decode(op: &'static str, id: &str, bytes: &[u8]) -> Result<Asset, RegistryError> {
    Asset::from_slice(bytes).map_err(|source| RegistryError::Marshal {
        op,
        id: id.to_string(),
        source,
    })
}

fn read_error<'a>(op: &'static str, id: &'a str) -> impl FnOnce(LedgerError) -> RegistryError + 'a {
    move |source| RegistryError::Read {
        op,
        id: id.to_string(),
        source,
    }
}

fn write_error<'a>(op: &'static str, id: &'a str) -> impl FnOnce(LedgerError) -> RegistryError + 'a {
    move |source| RegistryError::Write {
        op,
        id: id.to_string(),
        source,
    }
}

/// Seeding reports encode failures as failed writes of that item.
fn seed_write_error(error: RegistryError) -> RegistryError {
    match error {
        RegistryError::Marshal { op, id, source } => RegistryError::Write {
            op,
            id,
            source: LedgerError::storage(format!("failed to marshal seed asset: {source}")),
        },
        other => other,
    }
}
