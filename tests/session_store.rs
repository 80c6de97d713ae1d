mod common;

use std::sync::Arc;
use std::time::Duration;

use common::StubApi;
use opendata_bridge::assistant::AssistantApi;
use opendata_bridge::error::BridgeError;
use opendata_bridge::session::SessionStore;

fn store(api: &Arc<StubApi>) -> SessionStore {
    let api: Arc<dyn AssistantApi> = api.clone();
    SessionStore::new(api)
}

#[tokio::test]
async fn test_first_contact_creates_one_thread() {
    let api = Arc::new(StubApi::new());
    let sessions = store(&api);

    let thread = sessions.ensure_thread("alice", true).await.unwrap();

    assert_eq!(api.created_threads(), vec![thread.clone()]);
    assert!(api.deleted_threads().is_empty());
    assert_eq!(sessions.get("alice").unwrap().thread_id().await, Some(thread));
}

#[tokio::test]
async fn test_thread_is_reused() {
    let api = Arc::new(StubApi::new());
    let sessions = store(&api);

    let first = sessions.get_or_create_thread("alice").await.unwrap();
    let second = sessions.ensure_thread("alice", false).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(api.created_threads().len(), 1);
}

#[tokio::test]
async fn test_reset_deletes_and_replaces_thread() {
    let api = Arc::new(StubApi::new());
    let sessions = store(&api);

    let first = sessions.ensure_thread("alice", false).await.unwrap();
    let second = sessions.reset_thread("alice").await.unwrap();

    assert_ne!(first, second);
    assert_eq!(api.deleted_threads(), vec![first]);
    assert_eq!(sessions.get("alice").unwrap().thread_id().await, Some(second));
}

#[tokio::test]
async fn test_users_get_separate_threads() {
    let api = Arc::new(StubApi::new());
    let sessions = store(&api);

    let alice = sessions.ensure_thread("alice", false).await.unwrap();
    let bob = sessions.ensure_thread("bob", false).await.unwrap();

    assert_ne!(alice, bob);
    assert_eq!(sessions.len(), 2);

    let mut users = sessions.list_user_ids();
    users.sort();
    assert_eq!(users, vec!["alice".to_string(), "bob".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_first_contact_creates_one_thread() {
    let api = Arc::new(StubApi::new().with_create_thread_delay(Duration::from_millis(50)));
    let sessions = store(&api);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let sessions = sessions.clone();
            tokio::spawn(async move { sessions.ensure_thread("alice", false).await })
        })
        .collect();

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap().unwrap());
    }

    assert_eq!(api.created_threads().len(), 1);
    assert!(ids.iter().all(|id| id == &ids[0]));
}

#[tokio::test]
async fn test_remove_deletes_thread_and_session() {
    let api = Arc::new(StubApi::new());
    let sessions = store(&api);

    let thread = sessions.ensure_thread("alice", false).await.unwrap();
    sessions.record_file("alice", "f1", b"data".to_vec());

    sessions.remove("alice").await.unwrap();

    assert_eq!(api.deleted_threads(), vec![thread]);
    assert!(sessions.get("alice").is_none());
    assert!(matches!(
        sessions.get_file("alice", "f1"),
        Err(BridgeError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_remove_unknown_user() {
    let api = Arc::new(StubApi::new());
    let sessions = store(&api);

    let err = sessions.remove("nobody").await.unwrap_err();
    assert!(matches!(err, BridgeError::NotFound(_)));
}

#[tokio::test]
async fn test_remove_keeps_session_when_remote_delete_fails() {
    let api = Arc::new(StubApi::new());
    let sessions = store(&api);

    let thread = sessions.ensure_thread("alice", false).await.unwrap();
    api.fail_deletes();

    assert!(sessions.remove("alice").await.is_err());
    assert_eq!(sessions.get("alice").unwrap().thread_id().await, Some(thread));
}

#[tokio::test]
async fn test_files_are_scoped_per_user() {
    let api = Arc::new(StubApi::new());
    let sessions = store(&api);

    sessions.record_file("alice", "f1", b"alice".to_vec());

    assert_eq!(sessions.get_file("alice", "f1").unwrap(), b"alice");
    assert!(sessions.get_file("bob", "f1").is_err());
    assert!(sessions.get_file("alice", "f2").is_err());
}

#[tokio::test]
async fn test_thread_ids_lists_live_threads() {
    let api = Arc::new(StubApi::new());
    let sessions = store(&api);

    let a = sessions.ensure_thread("alice", false).await.unwrap();
    let b = sessions.ensure_thread("bob", false).await.unwrap();
    sessions.record_file("carol", "f1", Vec::new());

    let mut ids = sessions.thread_ids().await;
    ids.sort();
    let mut expected = vec![a, b];
    expected.sort();
    assert_eq!(ids, expected);
}

#[tokio::test(start_paused = true)]
async fn test_chat_during_remove_lands_in_live_session() {
    let api = Arc::new(StubApi::new().with_delete_thread_delay(Duration::from_millis(50)));
    let sessions = store(&api);

    let old = sessions.ensure_thread("alice", false).await.unwrap();

    let remover = {
        let sessions = sessions.clone();
        tokio::spawn(async move { sessions.remove("alice").await })
    };
    // Let the remove take the thread slot and start the remote delete.
    tokio::time::sleep(Duration::from_millis(10)).await;

    let chat = {
        let sessions = sessions.clone();
        tokio::spawn(async move { sessions.ensure_thread("alice", false).await })
    };

    remover.await.unwrap().unwrap();
    let new = chat.await.unwrap().unwrap();

    assert_ne!(new, old);
    assert_eq!(api.deleted_threads(), vec![old]);
    assert_eq!(sessions.thread_ids().await, vec![new.clone()]);
    assert_eq!(sessions.get("alice").unwrap().thread_id().await, Some(new));
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_removes_delete_once() {
    let api = Arc::new(StubApi::new().with_delete_thread_delay(Duration::from_millis(50)));
    let sessions = store(&api);

    sessions.ensure_thread("alice", false).await.unwrap();

    let first = {
        let sessions = sessions.clone();
        tokio::spawn(async move { sessions.remove("alice").await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    let second = sessions.remove("alice").await;

    first.await.unwrap().unwrap();
    assert!(matches!(second, Err(BridgeError::NotFound(_))));
    assert_eq!(api.deleted_threads().len(), 1);
}
