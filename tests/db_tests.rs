use std::sync::{Arc, Barrier};

use palaver::db::{iso_days_ago, ChatDB, Role};
use palaver::error::PalaverError;

fn test_db() -> ChatDB {
    ChatDB::open(":memory:").expect("in-memory db")
}

#[test]
fn get_or_create_user_creates_new() {
    let db = test_db();
    let id = db.get_or_create_user(123).unwrap();
    assert!(id > 0);
}

#[test]
fn get_or_create_user_is_idempotent() {
    let db = test_db();
    let first = db.get_or_create_user(123).unwrap();
    let second = db.get_or_create_user(123).unwrap();
    assert_eq!(first, second);
    assert_eq!(db.count_users().unwrap(), 1);
}

#[test]
fn distinct_tenants_get_distinct_ids() {
    let db = test_db();
    let a = db.get_or_create_user(123).unwrap();
    let b = db.get_or_create_user(456).unwrap();
    assert_ne!(a, b);
    assert_eq!(db.count_users().unwrap(), 2);
}

#[test]
fn concurrent_first_contact_creates_one_user() {
    // file-backed so concurrent writers go through WAL + busy_timeout
    let path = std::env::temp_dir().join(format!("palaver-race-{}.db", uuid::Uuid::new_v4()));
    let db = Arc::new(ChatDB::open(path.to_str().unwrap()).unwrap());
    let threads = 4;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let db = db.clone();
            let barrier = barrier.clone();
            std::thread::spawn(move || {
                barrier.wait();
                db.get_or_create_user(777).unwrap()
            })
        })
        .collect();

    let ids: Vec<i64> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(ids.windows(2).all(|w| w[0] == w[1]), "ids diverged: {ids:?}");
    assert_eq!(db.count_users().unwrap(), 1);

    drop(db);
    for suffix in ["", "-wal", "-shm"] {
        let _ = std::fs::remove_file(format!("{}{suffix}", path.display()));
    }
}

#[test]
fn soft_deleted_user_reactivates_on_return() {
    let db = test_db();
    let id = db.get_or_create_user(123).unwrap();
    assert!(db.delete_user(id).unwrap());
    assert_eq!(db.count_users().unwrap(), 0);

    // same tenant comes back: same surrogate id, active again
    let again = db.get_or_create_user(123).unwrap();
    assert_eq!(again, id);
    assert_eq!(db.count_users().unwrap(), 1);

    let user = db.get_user(id).unwrap().unwrap();
    assert!(user.deleted_at.is_none());
}

#[test]
fn delete_user_is_idempotent() {
    let db = test_db();
    let id = db.get_or_create_user(123).unwrap();
    assert!(db.delete_user(id).unwrap());
    assert!(!db.delete_user(id).unwrap());
}

#[test]
fn add_and_list_messages() {
    let db = test_db();
    let uid = db.get_or_create_user(123).unwrap();
    db.add_message(uid, Role::User, "Test message").unwrap();

    let messages = db.list_messages(uid).unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].role, Role::User);
    assert_eq!(messages[0].content, "Test message");
    assert!(messages[0].deleted_at.is_none());
}

#[test]
fn list_messages_empty_is_ok() {
    let db = test_db();
    let uid = db.get_or_create_user(123).unwrap();
    assert!(db.list_messages(uid).unwrap().is_empty());
}

#[test]
fn message_for_unknown_user_is_an_error() {
    let db = test_db();
    let err = db.add_message(9999, Role::User, "orphan").unwrap_err();
    assert!(matches!(err, PalaverError::UnknownUser(9999)), "got {err:?}");
}

#[test]
fn length_is_character_count() {
    let db = test_db();
    let uid = db.get_or_create_user(123).unwrap();
    let msg = db.add_message(uid, Role::User, "привет").unwrap();
    assert_eq!(msg.length, 6);

    let stored = db.list_messages(uid).unwrap();
    assert_eq!(stored[0].length, 6);
}

#[test]
fn list_orders_by_timestamp_not_insert_order() {
    let db = test_db();
    let uid = db.get_or_create_user(123).unwrap();
    db.add_message_at(uid, Role::User, "second", &iso_days_ago(1)).unwrap();
    db.add_message_at(uid, Role::User, "first", &iso_days_ago(2)).unwrap();

    let contents: Vec<_> = db
        .list_messages(uid)
        .unwrap()
        .into_iter()
        .map(|m| m.content)
        .collect();
    assert_eq!(contents, vec!["first", "second"]);
}

#[test]
fn clear_messages_hides_history() {
    let db = test_db();
    let uid = db.get_or_create_user(123).unwrap();
    db.add_message(uid, Role::User, "Message 1").unwrap();
    db.add_message(uid, Role::Assistant, "Message 2").unwrap();
    assert_eq!(db.list_messages(uid).unwrap().len(), 2);

    assert_eq!(db.clear_messages(uid).unwrap(), 2);
    assert!(db.list_messages(uid).unwrap().is_empty());

    // idempotent: clearing again clears nothing
    assert_eq!(db.clear_messages(uid).unwrap(), 0);
}

#[test]
fn messages_after_clear_are_visible_and_ordered() {
    let db = test_db();
    let uid = db.get_or_create_user(123).unwrap();
    db.add_message(uid, Role::User, "old").unwrap();
    db.clear_messages(uid).unwrap();

    db.add_message(uid, Role::User, "new question").unwrap();
    db.add_message(uid, Role::Assistant, "new answer").unwrap();

    let contents: Vec<_> = db
        .list_messages(uid)
        .unwrap()
        .into_iter()
        .map(|m| m.content)
        .collect();
    assert_eq!(contents, vec!["new question", "new answer"]);
}

#[test]
fn clear_is_per_tenant() {
    let db = test_db();
    let a = db.get_or_create_user(1).unwrap();
    let b = db.get_or_create_user(2).unwrap();
    db.add_message(a, Role::User, "a's message").unwrap();
    db.add_message(b, Role::User, "b's message").unwrap();

    db.clear_messages(a).unwrap();
    assert!(db.list_messages(a).unwrap().is_empty());
    assert_eq!(db.list_messages(b).unwrap().len(), 1);
}
