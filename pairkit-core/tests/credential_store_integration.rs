//! Integration tests for the credential store against a real JSON file.

mod common;

use std::collections::HashSet;
use std::sync::Arc;

use pairkit_core::{
    AuthInfo, CredentialStore, KeyValueStore, MemoryStore, OsSecretGenerator, PairingStoreError,
};

fn memory_store() -> CredentialStore {
    CredentialStore::initialize(common::TEST_PIN, Arc::new(MemoryStore::new()), &OsSecretGenerator)
        .expect("initialize")
}

#[test]
fn test_bootstrap_completeness() {
    let backend = Arc::new(MemoryStore::new());
    let store = CredentialStore::initialize(common::TEST_PIN, backend.clone(), &OsSecretGenerator)
        .expect("initialize");

    let keys: HashSet<String> = backend.keys().expect("keys").into_iter().collect();
    assert_eq!(
        keys,
        HashSet::from(["device_id", "salt", "private_key"].map(String::from))
    );

    assert_eq!(
        backend.get("device_id").expect("get").as_deref(),
        Some(store.device_id())
    );
    assert_eq!(
        backend.get("salt").expect("get"),
        Some(store.salt().to_string())
    );
    assert_eq!(store.private_key().expect("private key").len(), 32);
    assert_eq!(store.pin(), common::TEST_PIN);
    assert!(!store.has_user().expect("has_user"));
}

#[test]
fn test_bootstrap_idempotent_across_restarts() {
    let (_dir, path) = common::temp_store();

    let first = common::open_store(&path);
    let device_id = first.device_id().to_string();
    let salt = first.salt();
    let private_key = first.private_key().expect("private key");
    drop(first);

    let second = common::open_store(&path);
    assert_eq!(second.device_id(), device_id);
    assert_eq!(second.salt(), salt);
    assert_eq!(second.private_key().expect("private key"), private_key);
}

#[test]
fn test_open_from_config_reuses_identity() {
    let (_dir, path) = common::temp_store();
    let config = common::config_for(&path);

    let first = CredentialStore::open(&config).expect("open");
    first.create_user("alice", &[1; 32]).expect("create");
    let public_key = first.public_key().expect("public key");
    drop(first);

    let second = CredentialStore::open(&config).expect("reopen");
    assert_eq!(second.public_key().expect("public key"), public_key);
    assert_eq!(second.user_public_key("alice").expect("lookup"), Some(vec![1; 32]));
}

#[test]
fn test_upsert_last_write_wins() {
    let store = memory_store();

    store.create_user("alice", &[1, 1, 1]).expect("create");
    store.create_user("alice", &[2, 2, 2]).expect("create");
    assert_eq!(store.user_public_key("alice").expect("lookup"), Some(vec![2, 2, 2]));
    assert_eq!(store.list_users().expect("list"), vec!["alice"]);
}

#[test]
fn test_remove_absent_user_is_noop() {
    let store = memory_store();

    store.remove_user("bob").expect("remove absent");
    assert!(!store.has_user().expect("has_user"));

    store.create_user("alice", &[3]).expect("create");
    store.remove_user("bob").expect("remove absent");
    assert!(store.has_user().expect("has_user"));
}

#[test]
fn test_has_user_tracks_records() {
    let (_dir, path) = common::temp_store();
    let store = common::open_store(&path);
    assert!(!store.has_user().expect("has_user"));

    store.create_user("alice", &[4; 32]).expect("create");
    assert!(store.has_user().expect("has_user"));

    store.remove_user("alice").expect("remove");
    assert!(!store.has_user().expect("has_user"));
    assert_eq!(store.user_public_key("alice").expect("lookup"), None);

    store.create_user("alice", &[4; 32]).expect("create");
    store.clear().expect("clear");
    assert!(!store.has_user().expect("has_user"));
}

#[test]
fn test_clear_preserves_identity() {
    let (_dir, path) = common::temp_store();
    let store = common::open_store(&path);
    let device_id = store.device_id().to_string();
    let salt = store.salt();
    let private_key = store.private_key().expect("private key");

    store.create_user("a", b"x").expect("create");
    store.create_user("b", b"y").expect("create");
    assert_eq!(store.clear().expect("clear"), 2);

    assert_eq!(store.user_public_key("a").expect("lookup"), None);
    assert_eq!(store.user_public_key("b").expect("lookup"), None);
    assert!(!store.has_user().expect("has_user"));
    assert_eq!(store.device_id(), device_id);
    assert_eq!(store.salt(), salt);
    assert_eq!(store.private_key().expect("private key"), private_key);

    // the identity must also survive on disk
    drop(store);
    let reopened = common::open_store(&path);
    assert_eq!(reopened.device_id(), device_id);
    assert_eq!(reopened.salt(), salt);
    assert!(reopened.list_users().expect("list").is_empty());
}

#[test]
fn test_concurrent_handles_do_not_lose_updates() {
    let (_dir, path) = common::temp_store();
    let server = common::open_store(&path);
    server.create_user("alice", b"a").expect("create alice");

    // an admin tool working on the live file
    let admin = common::open_store(&path);
    assert_eq!(admin.device_id(), server.device_id());
    assert_eq!(admin.clear().expect("clear"), 1);
    assert_eq!(server.user_public_key("alice").expect("lookup"), None);

    server.create_user("bob", b"b").expect("create bob");
    assert_eq!(admin.list_users().expect("list"), vec!["bob"]);

    drop(server);
    drop(admin);
    let reopened = common::open_store(&path);
    assert_eq!(reopened.list_users().expect("list"), vec!["bob"]);
}

#[test]
fn test_concurrent_writers_on_one_file() {
    let (_dir, path) = common::temp_store();
    common::open_store(&path);

    let handles: Vec<_> = (0..4)
        .map(|worker| {
            let path = path.clone();
            std::thread::spawn(move || {
                // each thread has its own handle, as separate processes would
                let store = common::open_store(&path);
                for i in 0..5 {
                    store
                        .create_user(&format!("w{worker}-{i}"), &[worker, i])
                        .expect("create");
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("join");
    }

    let users = common::open_store(&path).list_users().expect("list");
    assert_eq!(users.len(), 20);
}

#[test]
fn test_malformed_salt_on_disk_fails_construction() {
    let (_dir, path) = common::temp_store();
    std::fs::write(&path, r#"{"salt": "pepper"}"#).expect("write");

    match CredentialStore::open(&common::config_for(&path)) {
        Err(PairingStoreError::Initialization { field, .. }) => assert_eq!(field, "salt"),
        Err(err) => panic!("unexpected error: {err}"),
        Ok(_) => panic!("expected error"),
    }
    let contents = std::fs::read_to_string(&path).expect("read");
    assert_eq!(contents, r#"{"salt": "pepper"}"#);
}

#[test]
fn test_store_is_usable_through_trait_object() {
    let store: Arc<dyn AuthInfo> = Arc::new(memory_store());

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                store
                    .create_user(&format!("client-{i}"), &[i; 32])
                    .expect("create");
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("join");
    }

    for i in 0..4u8 {
        assert_eq!(
            store.user_public_key(&format!("client-{i}")).expect("lookup"),
            Some(vec![i; 32])
        );
    }
}
