//! Property tests for the registry entry points.
//!
//! Each case runs against a fresh scripted host so the store contents can be
//! compared byte-for-byte before and after an operation.

use proptest::collection::btree_map;
use proptest::prelude::*;

use asset_registry::{Asset, AssetRegistry, RegistryError};

mod support;
use support::ScriptedContext;

fn id_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z0-9_-]{1,12}"
}

fn owner_strategy() -> impl Strategy<Value = String> {
    "\\PC{0,24}"
}

fn populated_context() -> impl Strategy<Value = ScriptedContext> {
    btree_map(id_strategy(), owner_strategy(), 0..8).prop_map(|assets| {
        assets
            .into_iter()
            .fold(ScriptedContext::new(), |ctx, (id, owner)| {
                ctx.with_asset(&id, &owner.replace(['"', '\\'], ""))
            })
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn asset_json_round_trips(id in "\\PC*", owner in "\\PC*") {
        let asset = Asset::new(id, owner);
        let bytes = asset.to_bytes().unwrap();
        prop_assert_eq!(Asset::from_slice(&bytes).unwrap(), asset);
    }

    #[test]
    fn created_asset_reads_back(mut ctx in populated_context(), id in id_strategy(), owner in owner_strategy()) {
        prop_assume!(!ctx.store.contains_key(&id));
        let registry = AssetRegistry::new();

        registry.create_asset(&mut ctx, &id, &owner).unwrap();

        prop_assert_eq!(registry.read_asset(&mut ctx, &id).unwrap(), Asset::new(id.clone(), owner));
        prop_assert!(registry.has_asset(&mut ctx, &id).unwrap());
    }

    #[test]
    fn duplicate_create_changes_nothing(mut ctx in populated_context(), owner in owner_strategy()) {
        prop_assume!(!ctx.store.is_empty());
        let id = ctx.store.keys().next().cloned().unwrap();
        let before = ctx.store.clone();

        let err = AssetRegistry::new().create_asset(&mut ctx, &id, &owner).unwrap_err();

        prop_assert!(matches!(err, RegistryError::AlreadyExists(ref found) if *found == id));
        prop_assert_eq!(&ctx.store, &before);
        prop_assert!(ctx.writes.is_empty());
    }

    #[test]
    fn update_of_absent_id_writes_nothing(mut ctx in populated_context(), id in id_strategy(), owner in owner_strategy()) {
        prop_assume!(!ctx.store.contains_key(&id));
        let before = ctx.store.clone();

        let err = AssetRegistry::new().update_asset(&mut ctx, &id, &owner).unwrap_err();

        prop_assert!(matches!(err, RegistryError::NotFound(_)));
        prop_assert_eq!(&ctx.store, &before);
    }

    #[test]
    fn update_touches_only_its_key(mut ctx in populated_context(), owner in owner_strategy()) {
        prop_assume!(!ctx.store.is_empty());
        let id = ctx.store.keys().last().cloned().unwrap();
        let mut expected = ctx.store.clone();
        expected.insert(id.clone(), Asset::new(id.clone(), owner.clone()).to_bytes().unwrap());
        let registry = AssetRegistry::new();

        registry.update_asset(&mut ctx, &id, &owner).unwrap();

        let read = registry.read_asset(&mut ctx, &id).unwrap();
        prop_assert_eq!(&read.id, &id);
        prop_assert_eq!(&read.owner, &owner);
        prop_assert_eq!(&ctx.store, &expected);
    }

    #[test]
    fn seed_is_stable(mut ctx in populated_context()) {
        let registry = AssetRegistry::new();
        registry.init_ledger(&mut ctx).unwrap();
        let once = ctx.store.clone();
        registry.init_ledger(&mut ctx).unwrap();

        prop_assert_eq!(&ctx.store, &once);
        prop_assert_eq!(registry.read_asset(&mut ctx, "1").unwrap(), Asset::new("1", "Alesso"));
        prop_assert_eq!(registry.read_asset(&mut ctx, "2").unwrap(), Asset::new("2", "Coldplay"));
    }
}
