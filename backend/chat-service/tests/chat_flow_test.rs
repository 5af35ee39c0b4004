// Chat flow integration tests
//
// Exercises the service layer end to end on the in-memory repository:
// 1. Send / list / summarize / mark read between two users
// 2. Per-viewer projections never leak across users
// 3. Concurrent senders keep a single total order
// 4. Push delivery through the connection registry, and push failures

use async_trait::async_trait;
use chat_service::{
    config::Config,
    error::AppError,
    models::Message,
    repository::InMemoryMessageRepository,
    services::{ChatService, DeliveryNotifier, InMemoryDirectory, NoopNotifier, NotifyError},
    state::AppState,
    websocket::WsOutboundEvent,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use uuid::Uuid;

fn directory(users: &[&str]) -> Arc<InMemoryDirectory> {
    Arc::new(InMemoryDirectory::with_users(users.iter().copied()))
}

fn state(users: &[&str]) -> AppState {
    AppState::new(
        Arc::new(Config::in_memory()),
        Arc::new(InMemoryMessageRepository::new()),
        directory(users),
    )
}

async fn next_event(rx: &mut UnboundedReceiver<String>) -> WsOutboundEvent {
    let raw = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for push")
        .expect("registry dropped the queue");
    serde_json::from_str(&raw).expect("push is a valid event")
}

#[tokio::test]
async fn test_two_user_conversation() {
    let state = state(&["alice", "bob"]);
    let chat = &state.chat;

    let hello = chat.send_message("alice", "bob", "hello", None).await.unwrap();
    let hi = chat.send_message("bob", "alice", "hi", None).await.unwrap();
    assert!(hello.sent_at < hi.sent_at);

    let history = chat.get_conversation("alice", "bob").await.unwrap();
    let texts: Vec<&str> = history.iter().map(|m| m.text.as_str()).collect();
    assert_eq!(texts, vec!["hello", "hi"]);

    // Same log from either side
    assert_eq!(history, chat.get_conversation("bob", "alice").await.unwrap());

    let for_bob = chat.get_conversation_summaries("bob").await.unwrap();
    assert_eq!(for_bob.len(), 1);
    assert_eq!(for_bob[0].peer_username, "alice");
    assert_eq!(for_bob[0].last_message.id, hi.id);
    assert_eq!(for_bob[0].unread_count, 1);
    assert_eq!(for_bob[0].unread_messages[0].id, hello.id);

    let for_alice = chat.get_conversation_summaries("alice").await.unwrap();
    assert_eq!(for_alice[0].peer_username, "bob");
    assert_eq!(for_alice[0].unread_messages[0].id, hi.id);

    assert_eq!(chat.mark_conversation_read("bob", "alice").await.unwrap(), 1);
    assert_eq!(chat.mark_conversation_read("bob", "alice").await.unwrap(), 0);

    let for_bob = chat.get_conversation_summaries("bob").await.unwrap();
    assert_eq!(for_bob[0].unread_count, 0);

    // Bob reading does not touch what Alice has not read
    let for_alice = chat.get_conversation_summaries("alice").await.unwrap();
    assert_eq!(for_alice[0].unread_count, 1);

    let history = chat.get_conversation("alice", "bob").await.unwrap();
    let read_at = history[0].read_at().expect("hello is read");
    assert!(read_at >= history[0].sent_at);
    assert!(history[1].read_at().is_none());
}

#[tokio::test]
async fn test_usernames_are_normalized() {
    let state = state(&["alice", "bob"]);
    let chat = &state.chat;

    let sent = chat
        .send_message(" Alice ", "BOB", "hello", None)
        .await
        .unwrap();
    assert_eq!(sent.sender_username, "alice");
    assert_eq!(sent.recipient_username, "bob");

    let history = chat.get_conversation("bob", "ALICE").await.unwrap();
    assert_eq!(history.len(), 1);
}

#[tokio::test]
async fn test_summaries_are_per_viewer() {
    let state = state(&["alice", "bob", "carol"]);
    let chat = &state.chat;

    chat.send_message("alice", "bob", "for bob", None).await.unwrap();
    chat.send_message("carol", "alice", "for alice", None).await.unwrap();

    let for_bob = chat.get_conversation_summaries("bob").await.unwrap();
    assert_eq!(for_bob.len(), 1);
    assert_eq!(for_bob[0].peer_username, "alice");

    let for_carol = chat.get_conversation_summaries("carol").await.unwrap();
    assert_eq!(for_carol.len(), 1);
    assert_eq!(for_carol[0].peer_username, "alice");
    assert_eq!(for_carol[0].unread_count, 0);

    // The carol conversation is the most recent one for alice
    let for_alice = chat.get_conversation_summaries("alice").await.unwrap();
    let peers: Vec<&str> = for_alice.iter().map(|s| s.peer_username.as_str()).collect();
    assert_eq!(peers, vec!["carol", "bob"]);

    assert!(chat
        .get_conversation_summaries("dave")
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_retry_with_same_id_is_idempotent() {
    let state = state(&["alice", "bob"]);
    let chat = &state.chat;
    let id = Uuid::new_v4();

    let first = chat
        .send_message("alice", "bob", "hello", Some(id))
        .await
        .unwrap();
    let retry = chat
        .send_message("alice", "bob", "hello", Some(id))
        .await
        .unwrap();
    assert_eq!(first, retry);
    assert_eq!(chat.get_conversation("alice", "bob").await.unwrap().len(), 1);

    let conflict = chat
        .send_message("alice", "bob", "something else", Some(id))
        .await;
    assert!(matches!(conflict, Err(AppError::IdConflict(got)) if got == id));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_senders_share_one_order() {
    let state = state(&["alice", "bob"]);
    let chat = Arc::clone(&state.chat);

    let mut handles = Vec::new();
    for i in 0..25 {
        let chat_a = Arc::clone(&chat);
        handles.push(tokio::spawn(async move {
            chat_a
                .send_message("alice", "bob", &format!("a{i}"), None)
                .await
        }));
        let chat_b = Arc::clone(&chat);
        handles.push(tokio::spawn(async move {
            chat_b
                .send_message("bob", "alice", &format!("b{i}"), None)
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let history = chat.get_conversation("alice", "bob").await.unwrap();
    assert_eq!(history.len(), 50);
    assert!(history
        .windows(2)
        .all(|w| w[0].ordering_key() < w[1].ordering_key()));

    let summary = &chat.get_conversation_summaries("alice").await.unwrap()[0];
    assert_eq!(summary.last_message.id, history[49].id);
    assert_eq!(summary.unread_count, 25);
}

#[tokio::test]
async fn test_registry_receives_pushes() {
    let state = state(&["alice", "bob"]);
    let (_, mut bob_rx) = state.registry.add_subscriber("bob").await;
    let (_, mut alice_rx) = state.registry.add_subscriber("alice").await;

    let sent = state
        .chat
        .send_message("alice", "bob", "hello", None)
        .await
        .unwrap();

    match next_event(&mut bob_rx).await {
        WsOutboundEvent::MessageNew { message } => assert_eq!(message.id, sent.id),
        other => panic!("unexpected event {other:?}"),
    }

    state.chat.mark_conversation_read("bob", "alice").await.unwrap();

    match next_event(&mut alice_rx).await {
        WsOutboundEvent::MessageRead {
            message_id,
            read_at,
        } => {
            assert_eq!(message_id, sent.id);
            assert!(read_at >= sent.sent_at);
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test]
async fn test_offline_recipient_does_not_fail_send() {
    let state = state(&["alice", "bob"]);
    let sent = state
        .chat
        .send_message("alice", "bob", "hello", None)
        .await
        .unwrap();

    // Bob connects afterwards and reads the backlog
    let history = state.chat.get_conversation("bob", "alice").await.unwrap();
    assert_eq!(history[0].id, sent.id);
}

struct FailingNotifier;

#[async_trait]
impl DeliveryNotifier for FailingNotifier {
    async fn notify_new_message(&self, _: &str, _: &Message) -> Result<(), NotifyError> {
        Err(NotifyError::Channel("broker down".into()))
    }

    async fn notify_read_receipt(
        &self,
        _: &str,
        _: Uuid,
        _: DateTime<Utc>,
    ) -> Result<(), NotifyError> {
        Err(NotifyError::Channel("broker down".into()))
    }
}

#[tokio::test]
async fn test_failing_notifier_does_not_break_writes() {
    let chat = ChatService::new(
        Arc::new(InMemoryMessageRepository::new()),
        directory(&["alice", "bob"]),
        Arc::new(FailingNotifier),
        4000,
    );

    let sent = chat.send_message("alice", "bob", "hello", None).await.unwrap();
    assert_eq!(chat.mark_conversation_read("bob", "alice").await.unwrap(), 1);
    assert_eq!(
        chat.mark_message_read("bob", "alice", sent.id).await.unwrap(),
        0
    );

    let history = chat.get_conversation("alice", "bob").await.unwrap();
    assert!(history[0].read_at().is_some());
}

#[tokio::test]
async fn test_single_message_read() {
    let chat = ChatService::new(
        Arc::new(InMemoryMessageRepository::new()),
        directory(&["alice", "bob"]),
        Arc::new(NoopNotifier),
        4000,
    );

    let first = chat.send_message("alice", "bob", "one", None).await.unwrap();
    let second = chat.send_message("alice", "bob", "two", None).await.unwrap();

    // Only the recipient can read a message
    assert!(matches!(
        chat.mark_message_read("alice", "bob", first.id).await,
        Err(AppError::NotFound)
    ));

    assert_eq!(chat.mark_message_read("bob", "alice", first.id).await.unwrap(), 1);
    assert_eq!(chat.mark_message_read("bob", "alice", first.id).await.unwrap(), 0);

    let summary = &chat.get_conversation_summaries("bob").await.unwrap()[0];
    assert_eq!(summary.unread_count, 1);
    assert_eq!(summary.unread_messages[0].id, second.id);

    // The rest of the conversation
    assert_eq!(chat.mark_conversation_read("bob", "alice").await.unwrap(), 1);
}
