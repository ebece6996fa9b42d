//! Durable values surviving a restart

use serde_json::json;
use tempfile::tempdir;

use courier_engine::{PersistentStore, THEME_KEY, TOKEN_KEY, USER_KEY};

use crate::common::{config_for, harness_with};

#[test]
fn session_survives_restart_through_storage() {
    let dir = tempdir().unwrap();
    {
        let store = PersistentStore::open_in(dir.path(), "courier");
        let mut h = harness_with(config_for("http://127.0.0.1:9"), store, "/");
        h.runtime.sign_in("t-1", json!({"id": 7, "name": "Ada"}));
        h.runtime.state().set(THEME_KEY, "dark").unwrap();
        h.runtime.store().session().set("draft", "unsent").unwrap();
        h.runtime.shutdown();
    }

    let store = PersistentStore::open_in(dir.path(), "courier");
    let h = harness_with(config_for("http://127.0.0.1:9"), store, "/");

    let state = h.runtime.state();
    assert_eq!(state.get::<String>(TOKEN_KEY).as_deref(), Some("t-1"));
    assert_eq!(state.get_value(USER_KEY), Some(json!({"id": 7, "name": "Ada"})));
    assert_eq!(state.get::<String>(THEME_KEY).as_deref(), Some("dark"));
    assert_eq!(h.runtime.http().token().as_deref(), Some("t-1"));
    assert!(h.runtime.store().session().get_value("draft").is_none());
}

#[test]
fn sign_out_removes_credentials_from_disk() {
    let dir = tempdir().unwrap();
    {
        let store = PersistentStore::open_in(dir.path(), "courier");
        let h = harness_with(config_for("http://127.0.0.1:9"), store, "/");
        h.runtime.sign_in("t-1", json!({"id": 7}));
        h.runtime.sign_out();
    }

    let store = PersistentStore::open_in(dir.path(), "courier");
    assert!(store.durable().get_value("token").is_none());
    assert!(store.durable().get_value("user").is_none());
}

#[test]
fn namespaces_do_not_see_each_other() {
    let dir = tempdir().unwrap();
    let ours = PersistentStore::open_in(dir.path(), "courier");
    ours.durable().set("theme", "dark").unwrap();

    let theirs = PersistentStore::open_in(dir.path(), "other");
    assert!(theirs.durable().get_value("theme").is_none());
    theirs.durable().set("theme", "light").unwrap();
    assert_eq!(theirs.durable().clear().unwrap(), 1);

    let reopened = PersistentStore::open_in(dir.path(), "courier");
    assert_eq!(reopened.durable().get::<String>("theme").as_deref(), Some("dark"));
}

#[test]
fn failed_write_back_is_reported_to_the_caller() {
    // A regular file where the storage directory should be makes every write fail.
    let blocker = tempfile::NamedTempFile::new().unwrap();
    let store = PersistentStore::open_in(blocker.path(), "courier");
    let h = harness_with(config_for("http://127.0.0.1:9"), store, "/");

    let delivery = h.runtime.sign_in("t-1", json!({"id": 7}));

    assert_eq!(delivery.failures.len(), 2);
    assert_eq!(h.runtime.state().get::<String>(TOKEN_KEY).as_deref(), Some("t-1"));
    assert!(h.runtime.store().durable().get_value("token").is_none());

    let delivery = h.runtime.sign_out();
    assert!(delivery.is_clean());
}
