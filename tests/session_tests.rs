use std::sync::Arc;

use palaver::db::{ChatDB, Role};
use palaver::llm::{ContentPart, LlmClient, TurnContent};
use palaver::session::{SessionStore, APOLOGY};

fn store() -> SessionStore {
    SessionStore::new(Arc::new(ChatDB::open(":memory:").expect("in-memory db")))
}

#[test]
fn new_tenant_has_empty_session() {
    let store = store();
    assert!(store.session(123).unwrap().is_empty());
}

#[test]
fn text_turns_round_trip() {
    let store = store();
    store
        .add_message(123, Role::User, "Привет".into(), None)
        .unwrap();
    store
        .add_message(123, Role::Assistant, "Здравствуйте".into(), None)
        .unwrap();

    let session = store.session(123).unwrap();
    assert_eq!(session.len(), 2);
    assert_eq!(session[0].role, Role::User);
    assert_eq!(session[0].content, TurnContent::Text("Привет".into()));
    assert_eq!(session[1].role, Role::Assistant);
    assert_eq!(session[1].content, TurnContent::Text("Здравствуйте".into()));
}

#[test]
fn text_turns_are_stored_as_bare_text() {
    let store = store();
    store
        .add_message(123, Role::User, "just text".into(), None)
        .unwrap();

    let uid = store.db().get_or_create_user(123).unwrap();
    let stored = store.db().list_messages(uid).unwrap();
    assert_eq!(stored[0].content, "just text");
    assert_eq!(stored[0].length, 9);
}

#[test]
fn image_turns_become_ordered_parts() {
    let store = store();
    store
        .add_message(123, Role::User, "look at this".into(), Some("QUJDRA==".into()))
        .unwrap();

    let uid = store.db().get_or_create_user(123).unwrap();
    let stored = store.db().list_messages(uid).unwrap();
    assert!(stored[0].content.starts_with('{'), "image turn should be enveloped");

    let session = store.session(123).unwrap();
    assert_eq!(
        session[0].content,
        TurnContent::Parts(vec![
            ContentPart::Text { text: "look at this".into() },
            ContentPart::Image { data: "QUJDRA==".into() },
        ])
    );
}

#[test]
fn empty_caption_omits_the_text_part() {
    let store = store();
    store
        .add_message(123, Role::User, String::new(), Some("QUJDRA==".into()))
        .unwrap();

    let session = store.session(123).unwrap();
    assert_eq!(
        session[0].content,
        TurnContent::Parts(vec![ContentPart::Image { data: "QUJDRA==".into() }])
    );
}

#[test]
fn undecodable_content_degrades_to_text() {
    let store = store();
    let uid = store.db().get_or_create_user(123).unwrap();
    let raw = "{\"kind\":\"image\",\"broken\":";
    store.db().add_message(uid, Role::User, raw).unwrap();

    let session = store.session(123).unwrap();
    assert_eq!(session[0].content, TurnContent::Text(raw.into()));
}

#[test]
fn clear_wipes_only_that_tenant() {
    let store = store();
    store.add_message(1, Role::User, "mine".into(), None).unwrap();
    store.add_message(2, Role::User, "theirs".into(), None).unwrap();

    assert_eq!(store.clear(1).unwrap(), 1);
    assert!(store.session(1).unwrap().is_empty());
    assert_eq!(store.session(2).unwrap().len(), 1);

    // clearing an already-empty session is a no-op
    assert_eq!(store.clear(1).unwrap(), 0);
}

#[test]
fn session_survives_after_clear_and_refill() {
    let store = store();
    store.add_message(1, Role::User, "old".into(), None).unwrap();
    store.clear(1).unwrap();
    store.add_message(1, Role::User, "new".into(), None).unwrap();

    let session = store.session(1).unwrap();
    assert_eq!(session.len(), 1);
    assert_eq!(session[0].content, TurnContent::Text("new".into()));
}

#[tokio::test]
async fn converse_degrades_to_apology_and_keeps_user_turn() {
    // a port that was just released: connection refused immediately
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let store = store();
    let llm = LlmClient::new(
        format!("http://127.0.0.1:{port}"),
        "test-model",
        "",
        "You are a test assistant.",
    );

    let reply = store
        .converse(&llm, 123, "does this work?".into(), None)
        .await
        .unwrap();
    assert_eq!(reply, APOLOGY);

    // the failed turn is not rolled back: the user message stays
    let session = store.session(123).unwrap();
    assert_eq!(session.len(), 1);
    assert_eq!(session[0].role, Role::User);
}
