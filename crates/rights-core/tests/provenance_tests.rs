//! Provenance integration tests
//!
//! End-to-end scenarios over the public engine API: derivation, transfer
//! chains, authorization and racing transfers.

mod common;

use std::sync::{Arc, Barrier};
use std::thread;

use common::{fields, novel};
use rights_core::{
    Entity, EntityKind, HolderCredential, PersistId, PersistenceError, RightsEngine, RightsError,
};
use serde_json::json;

// === Derivation ===

#[test]
fn test_derived_right_reports_its_source() {
    let engine = RightsEngine::in_memory();
    let author = HolderCredential::generate();
    let copyright = novel(&engine, &author);

    let right = engine
        .derive_right(
            fields(json!({"name": "Film adaptation"})),
            copyright.persist_id(),
            &author,
        )
        .unwrap();

    let entity = engine.resolve(right.persist_id()).unwrap();
    assert_eq!(entity.kind(), EntityKind::Right);
    assert_eq!(entity.source(), Some(copyright.persist_id()));
    assert_eq!(entity.current_holder(), author.public_key());
}

#[test]
fn test_many_rights_share_one_source() {
    let engine = RightsEngine::in_memory();
    let author = HolderCredential::generate();
    let copyright = novel(&engine, &author);

    let ids: Vec<PersistId> = (0..3)
        .map(|i| {
            engine
                .derive_right(
                    fields(json!({"name": format!("Translation {}", i)})),
                    copyright.persist_id(),
                    &author,
                )
                .unwrap()
                .persist_id()
                .clone()
        })
        .collect();

    for id in &ids {
        let entity = engine.resolve(id).unwrap();
        assert_eq!(entity.source(), Some(copyright.persist_id()));
    }
    assert_ne!(ids[0], ids[1]);
}

#[test]
fn test_right_derived_from_right() {
    let engine = RightsEngine::in_memory();
    let author = HolderCredential::generate();
    let copyright = novel(&engine, &author);
    let first = engine
        .derive_right(Default::default(), copyright.persist_id(), &author)
        .unwrap();
    let second = engine
        .derive_right(Default::default(), first.persist_id(), &author)
        .unwrap();

    assert_eq!(second.source(), first.persist_id());
}

// === Resolution ===

#[test]
fn test_copyright_resolves_through_fallback() {
    let engine = RightsEngine::in_memory();
    let author = HolderCredential::generate();
    let copyright = novel(&engine, &author);

    let first = engine.resolve(copyright.persist_id()).unwrap();
    let second = engine.resolve(copyright.persist_id()).unwrap();

    assert_eq!(first.kind(), EntityKind::Copyright);
    assert_eq!(first, second);
    assert_eq!(engine.serialize(&first), engine.serialize(&second));
}

#[test]
fn test_unknown_id_is_not_found() {
    let engine = RightsEngine::in_memory();
    let missing = PersistId::from("00000000-0000-4000-8000-000000000000");

    assert!(matches!(
        engine.resolve(&missing),
        Err(RightsError::NotFound(_))
    ));
    assert!(matches!(
        engine.history(&missing).events(),
        Err(RightsError::NotFound(_))
    ));
}

// === Transfers and history ===

#[test]
fn test_transfer_chain_history() {
    let engine = RightsEngine::in_memory();
    let holders: Vec<HolderCredential> = (0..4).map(|_| HolderCredential::generate()).collect();
    let copyright = novel(&engine, &holders[0]);
    let right = engine
        .derive_right(Default::default(), copyright.persist_id(), &holders[0])
        .unwrap();

    let mut event_ids = Vec::new();
    for pair in holders.windows(2) {
        let entity = engine.resolve(right.persist_id()).unwrap();
        let assignment = engine
            .transfer_right(&entity, None, &pair[0], pair[1].public_key())
            .unwrap();
        event_ids.push(assignment.event_id);
    }

    let history = engine.history(right.persist_id()).events().unwrap();
    assert_eq!(history.len(), 3);
    for (i, event) in history.iter().enumerate() {
        assert_eq!(&event.user.public_key, holders[i].public_key());
        assert_eq!(&event.new_holder, holders[i + 1].public_key());
        assert!(event.user.private_key.is_none());
        assert_eq!(event.event_id, event_ids[i]);
    }

    let entity = engine.resolve(right.persist_id()).unwrap();
    assert_eq!(entity.current_holder(), holders[3].public_key());
}

#[test]
fn test_copyright_can_be_transferred() {
    let engine = RightsEngine::in_memory();
    let author = HolderCredential::generate();
    let estate = HolderCredential::generate();
    let copyright = novel(&engine, &author);

    let entity = Entity::from(copyright.clone());
    let assignment = engine
        .transfer_right(
            &entity,
            Some(fields(json!({"reason": "inheritance"}))),
            &author,
            estate.public_key(),
        )
        .unwrap();
    assert!(engine.verify_assignment(&assignment).is_ok());

    let history = engine.history(copyright.persist_id()).events().unwrap();
    assert_eq!(history.len(), 1);
}

#[test]
fn test_unauthorized_transfer_writes_nothing() {
    let engine = RightsEngine::in_memory();
    let author = HolderCredential::generate();
    let stranger = HolderCredential::generate();
    let copyright = novel(&engine, &author);
    let right = engine
        .derive_right(Default::default(), copyright.persist_id(), &author)
        .unwrap();
    let entity = engine.resolve(right.persist_id()).unwrap();

    let result = engine.transfer_right(&entity, None, &stranger, stranger.public_key());
    assert!(matches!(result, Err(RightsError::Unauthorized(_))));

    assert!(engine.history(right.persist_id()).is_empty().unwrap());
    let reloaded = engine.resolve(right.persist_id()).unwrap();
    assert_eq!(reloaded.current_holder(), author.public_key());
}

#[test]
fn test_former_holder_with_stale_entity_is_unauthorized() {
    let engine = RightsEngine::in_memory();
    let a = HolderCredential::generate();
    let b = HolderCredential::generate();
    let c = HolderCredential::generate();
    let copyright = novel(&engine, &a);
    let stale = engine.resolve(copyright.persist_id()).unwrap();

    engine
        .transfer_right(&stale, None, &a, b.public_key())
        .unwrap();

    // The loaded entity still names `a`, but the ledger no longer does
    let result = engine.transfer_right(&stale, None, &a, c.public_key());
    assert!(matches!(result, Err(RightsError::Unauthorized(_))));
    assert_eq!(engine.history(copyright.persist_id()).len().unwrap(), 1);
}

#[test]
fn test_racing_transfers_commit_at_most_once() {
    let engine = RightsEngine::in_memory();
    let owner = HolderCredential::generate();
    let copyright = novel(&engine, &owner);
    let entity = engine.resolve(copyright.persist_id()).unwrap();

    let owner = Arc::new(owner);
    let barrier = Arc::new(Barrier::new(2));
    let handles: Vec<_> = (0..2)
        .map(|_| {
            let engine = engine.clone();
            let entity = entity.clone();
            let owner = Arc::clone(&owner);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let recipient = HolderCredential::generate();
                barrier.wait();
                engine.transfer_right(&entity, None, &owner, recipient.public_key())
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let committed = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(committed, 1);
    // The loser either read the old holder and lost the commit, or read the
    // new holder and was refused
    assert!(results.iter().any(|r| matches!(
        r,
        Err(RightsError::Persistence(PersistenceError::Conflict(_)))
            | Err(RightsError::Unauthorized(_))
    )));

    let history = engine.history(copyright.persist_id()).events().unwrap();
    assert_eq!(history.len(), 1);
    let holder = engine.resolve(copyright.persist_id()).unwrap();
    assert_eq!(holder.current_holder(), &history[0].new_holder);
}

// === Linked data ===

#[test]
fn test_linked_data_uses_configured_context() {
    let ledger = Arc::new(rights_core::InMemoryLedger::new());
    let engine = RightsEngine::new(
        ledger,
        rights_core::LinkedDataConfig {
            context: "https://example.org/rights".to_string(),
        },
    );
    let author = HolderCredential::generate();
    let copyright = novel(&engine, &author);

    let doc = engine
        .serialize(&engine.resolve(copyright.persist_id()).unwrap())
        .into_value();
    assert_eq!(doc["@context"], "https://example.org/rights");
    assert_eq!(doc["@type"], "Copyright");
    assert_eq!(doc["@id"], copyright.persist_id().as_str());
    assert_eq!(doc["name"], "The Long Afternoon");
}

// === SQLite backend ===

#[cfg(feature = "sqlite")]
mod sqlite {
    use super::*;
    use crate::common::sqlite_engine;

    #[test]
    fn test_history_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let a = HolderCredential::generate();
        let b = HolderCredential::generate();

        let right_id = {
            let engine = sqlite_engine(dir.path());
            let copyright = novel(&engine, &a);
            let right = engine
                .derive_right(Default::default(), copyright.persist_id(), &a)
                .unwrap();
            let entity = engine.resolve(right.persist_id()).unwrap();
            engine
                .transfer_right(&entity, None, &a, b.public_key())
                .unwrap();
            right.persist_id().clone()
        };

        let engine = sqlite_engine(dir.path());
        let entity = engine.resolve(&right_id).unwrap();
        assert_eq!(entity.kind(), EntityKind::Right);
        assert_eq!(entity.current_holder(), b.public_key());

        let history = engine.history(&right_id).events().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(&history[0].user.public_key, a.public_key());
    }

    #[test]
    fn test_sqlite_rejects_dangling_source() {
        let dir = tempfile::tempdir().unwrap();
        let engine = sqlite_engine(dir.path());
        let a = HolderCredential::generate();

        let result = engine.derive_right(Default::default(), &PersistId::from("ghost"), &a);
        assert!(matches!(
            result,
            Err(RightsError::Persistence(PersistenceError::DanglingReference(_)))
        ));
    }

    #[test]
    fn test_sqlite_racing_transfers() {
        let dir = tempfile::tempdir().unwrap();
        let engine = sqlite_engine(dir.path());
        let owner = Arc::new(HolderCredential::generate());
        let copyright = novel(&engine, &owner);
        let entity = engine.resolve(copyright.persist_id()).unwrap();

        let barrier = Arc::new(Barrier::new(2));
        let handles: Vec<_> = (0..2)
            .map(|_| {
                let engine = engine.clone();
                let entity = entity.clone();
                let owner = Arc::clone(&owner);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    let recipient = HolderCredential::generate();
                    barrier.wait();
                    engine.transfer_right(&entity, None, &owner, recipient.public_key())
                })
            })
            .collect();

        let committed = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|r| r.is_ok())
            .count();
        assert_eq!(committed, 1);
        assert_eq!(engine.history(copyright.persist_id()).len().unwrap(), 1);
    }
}
