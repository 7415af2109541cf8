//! Integration tests for the streaming relay.
//!
//! These tests drive the end-to-end turn over the real in-memory store and
//! the mock gateway:
//! 1. RelayHandler persists the user turn and the assistant placeholder
//! 2. The gateway delta stream is accumulated under throttling
//! 3. Exactly one finalize write closes the streaming latch
//! 4. Failure paths finalize with the documented diagnostics

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chat_relay::adapters::{InMemoryMessageStore, MockChatGateway};
use chat_relay::application::{
    cancellation, RelayCommand, RelayConfig, RelayHandler, RelayOutcome,
};
use chat_relay::application::handlers::{CANCELLED_DIAGNOSTIC, MISSING_CREDENTIAL_DIAGNOSTIC};
use chat_relay::domain::conversation::{Message, Role};
use chat_relay::domain::foundation::ConversationId;
use chat_relay::ports::{
    ConversationStore, MessageFeed, MessageStore, StoreError, UpdateListener,
};

// =============================================================================
// Test Infrastructure
// =============================================================================

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

async fn setup(
    gateway: MockChatGateway,
) -> (
    Arc<RelayHandler<MockChatGateway, InMemoryMessageStore>>,
    Arc<InMemoryMessageStore>,
    ConversationId,
) {
    init_tracing();
    let store = Arc::new(InMemoryMessageStore::new());
    let conversation_id = store
        .create_conversation("New Chat", "openai/gpt-4o-mini")
        .await
        .unwrap();
    let handler = Arc::new(RelayHandler::new(Arc::new(gateway), Arc::clone(&store)));
    (handler, store, conversation_id)
}

async fn relay_hello(
    handler: &RelayHandler<MockChatGateway, InMemoryMessageStore>,
    conversation_id: ConversationId,
) -> RelayOutcome {
    handler
        .relay(RelayCommand::new(
            conversation_id,
            "Hello",
            "openai/gpt-4o-mini",
        ))
        .await
        .unwrap()
}

async fn assistant_message(
    store: &InMemoryMessageStore,
    conversation_id: ConversationId,
) -> Message {
    store
        .list_messages(conversation_id)
        .await
        .unwrap()
        .into_iter()
        .find(|m| m.role() == Role::Assistant)
        .expect("assistant message missing")
}

/// Listener recording each pushed snapshot's last assistant content.
#[derive(Default)]
struct SnapshotListener {
    snapshots: Mutex<Vec<Vec<String>>>,
}

impl SnapshotListener {
    fn snapshots(&self) -> Vec<Vec<String>> {
        self.snapshots.lock().unwrap().clone()
    }
}

impl UpdateListener for SnapshotListener {
    fn on_update(&self, _conversation_id: ConversationId, messages: &[Message]) {
        self.snapshots
            .lock()
            .unwrap()
            .push(messages.iter().map(|m| m.content().to_string()).collect());
    }
}

// =============================================================================
// Success path
// =============================================================================

#[tokio::test]
async fn scenario_a_deltas_concatenate_into_the_final_content() {
    let gateway = MockChatGateway::new().with_deltas(["Hi", " there"]);
    let (handler, store, conversation_id) = setup(gateway).await;

    let outcome = relay_hello(&handler, conversation_id).await;

    let messages = store.list_messages(conversation_id).await.unwrap();
    assert_eq!(messages.len(), 2);

    assert_eq!(messages[0].id(), outcome.user_message_id);
    assert_eq!(messages[0].role(), Role::User);
    assert_eq!(messages[0].content(), "Hello");
    assert!(!messages[0].is_streaming());

    assert_eq!(messages[1].id(), outcome.assistant_message_id);
    assert_eq!(messages[1].role(), Role::Assistant);
    assert_eq!(messages[1].content(), "Hi there");
    assert!(!messages[1].is_streaming());
    assert_eq!(messages[1].model(), Some("openai/gpt-4o-mini"));
}

#[tokio::test]
async fn the_user_turn_is_durable_before_the_placeholder() {
    let gateway = MockChatGateway::new().with_deltas(["ok"]);
    let (handler, store, conversation_id) = setup(gateway).await;

    let listener = Arc::new(SnapshotListener::default());
    let _subscription = store.subscribe(conversation_id, listener.clone());

    relay_hello(&handler, conversation_id).await;

    let snapshots = listener.snapshots();
    // First observable write is the user turn alone.
    assert_eq!(snapshots[0], vec!["Hello".to_string()]);
    // The placeholder appears only in a later write.
    assert_eq!(snapshots[1].len(), 2);
    assert_eq!(snapshots[1][1], "");
}

#[tokio::test]
async fn the_prompt_contains_history_but_never_the_placeholder() {
    let gateway = MockChatGateway::new()
        .with_deltas(["Hi there"])
        .with_deltas(["I'm fine"]);
    // Clones share the recording state with the handler's copy.
    let calls_view = gateway.clone();
    let (handler, _store, conversation_id) = setup(gateway).await;

    relay_hello(&handler, conversation_id).await;
    handler
        .relay(RelayCommand::new(
            conversation_id,
            "How are you?",
            "openai/gpt-4o-mini",
        ))
        .await
        .unwrap();

    let calls = calls_view.calls();
    assert_eq!(calls.len(), 2);

    // First turn: only the just-written user message survives the filter.
    let first: Vec<_> = calls[0]
        .messages
        .iter()
        .map(|m| (m.role, m.content.as_str()))
        .collect();
    assert_eq!(first, vec![(Role::User, "Hello")]);

    // Second turn: full finalized history plus the new user turn.
    let second: Vec<_> = calls[1]
        .messages
        .iter()
        .map(|m| (m.role, m.content.as_str()))
        .collect();
    assert_eq!(
        second,
        vec![
            (Role::User, "Hello"),
            (Role::Assistant, "Hi there"),
            (Role::User, "How are you?"),
        ]
    );
}

// =============================================================================
// Failure paths
// =============================================================================

#[tokio::test]
async fn missing_credential_finalizes_without_any_gateway_call() {
    let gateway = MockChatGateway::new().without_credential();
    let calls_view = gateway.clone();
    let (handler, store, conversation_id) = setup(gateway).await;

    relay_hello(&handler, conversation_id).await;

    assert_eq!(calls_view.call_count(), 0);
    let assistant = assistant_message(&store, conversation_id).await;
    assert_eq!(assistant.content(), MISSING_CREDENTIAL_DIAGNOSTIC);
    assert!(!assistant.is_streaming());
}

#[tokio::test]
async fn scenario_b_http_rejection_embeds_status_and_body() {
    let gateway = MockChatGateway::new().with_http_error(429, "rate limited");
    let (handler, store, conversation_id) = setup(gateway).await;

    relay_hello(&handler, conversation_id).await;

    let assistant = assistant_message(&store, conversation_id).await;
    assert!(assistant.content().contains("429"));
    assert!(assistant.content().contains("rate limited"));
    assert!(assistant.content().starts_with("Error from OpenRouter"));
    assert!(!assistant.is_streaming());
}

#[tokio::test]
async fn scenario_c_mid_stream_failure_discards_partial_content() {
    let gateway = MockChatGateway::new().with_stream_failure(
        ["The", " answer", " is"],
        "connection reset",
    );
    let (handler, store, conversation_id) = setup(gateway).await;

    relay_hello(&handler, conversation_id).await;

    let assistant = assistant_message(&store, conversation_id).await;
    // The diagnostic alone: the three deltas are not present.
    assert!(assistant.content().starts_with("Error:"));
    assert!(assistant.content().contains("connection reset"));
    assert!(!assistant.content().contains("The answer"));
    assert!(!assistant.is_streaming());

    let messages = store.list_messages(conversation_id).await.unwrap();
    assert_eq!(messages.len(), 2);
}

#[tokio::test]
async fn request_send_failure_finalizes_with_a_diagnostic() {
    let gateway = MockChatGateway::new().with_network_error("dns lookup failed");
    let (handler, store, conversation_id) = setup(gateway).await;

    relay_hello(&handler, conversation_id).await;

    let assistant = assistant_message(&store, conversation_id).await;
    assert!(assistant.content().starts_with("Error:"));
    assert!(assistant.content().contains("dns lookup failed"));
    assert!(!assistant.is_streaming());
}

#[tokio::test]
async fn relay_into_an_unknown_conversation_is_a_store_error() {
    let gateway = MockChatGateway::new().with_deltas(["x"]);
    init_tracing();
    let store = Arc::new(InMemoryMessageStore::new());
    let handler = RelayHandler::new(Arc::new(gateway), Arc::clone(&store));

    let err = handler
        .relay(RelayCommand::new(ConversationId::new(), "Hello", "m"))
        .await
        .unwrap_err();
    let chat_relay::application::RelayError::Store(err) = err;
    assert!(matches!(err, StoreError::ConversationNotFound(_)));
}

// =============================================================================
// Lifecycle and throttling
// =============================================================================

#[tokio::test]
async fn the_streaming_latch_never_reopens_after_finalize() {
    let gateway = MockChatGateway::new().with_deltas(["done"]);
    let (handler, store, conversation_id) = setup(gateway).await;

    let outcome = relay_hello(&handler, conversation_id).await;

    let err = store
        .update_streaming(outcome.assistant_message_id, "late write")
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NotStreaming(_)));

    let err = store
        .finish_streaming(outcome.assistant_message_id, "second finalize")
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NotStreaming(_)));

    let assistant = assistant_message(&store, conversation_id).await;
    assert_eq!(assistant.content(), "done");
}

#[tokio::test(start_paused = true)]
async fn content_writes_are_throttled_but_lose_nothing() {
    let deltas: Vec<String> = (0..30).map(|i| format!("{} ", i)).collect();
    let expected: String = deltas.concat();

    let gateway = MockChatGateway::new()
        .with_deltas(deltas.clone())
        .with_delta_delay(Duration::from_millis(10));
    let (handler, store, conversation_id) = setup(gateway).await;

    let listener = Arc::new(SnapshotListener::default());
    let _subscription = store.subscribe(conversation_id, listener.clone());

    relay_hello(&handler, conversation_id).await;

    let snapshots = listener.snapshots();
    // Two creates, the throttled content patches, one finalize. 30 deltas
    // spaced 10ms apart fit in ~300ms, so at most a handful of patches.
    let patch_count = snapshots.len().saturating_sub(3);
    assert!(
        patch_count < deltas.len() / 2,
        "expected coalesced writes, saw {} for {} deltas",
        patch_count,
        deltas.len()
    );

    // Monotonic growth: each snapshot's assistant content is a prefix of
    // the final content.
    for snapshot in &snapshots[2..] {
        assert!(expected.starts_with(&snapshot[1]));
    }

    let assistant = assistant_message(&store, conversation_id).await;
    assert_eq!(assistant.content(), expected);
    assert!(!assistant.is_streaming());
}

// =============================================================================
// Concurrency
// =============================================================================

#[tokio::test]
async fn scenario_d_concurrent_relays_on_one_conversation_serialize() {
    let gateway = MockChatGateway::new()
        .with_deltas(["first reply"])
        .with_deltas(["second reply"]);
    let (handler, store, conversation_id) = setup(gateway).await;

    let first = handler.relay(RelayCommand::new(conversation_id, "one", "m"));
    let second = handler.relay(RelayCommand::new(conversation_id, "two", "m"));
    let (first, second) = tokio::join!(first, second);
    first.unwrap();
    second.unwrap();

    let messages = store.list_messages(conversation_id).await.unwrap();
    assert_eq!(messages.len(), 4);

    // Turns never interleave: user, assistant, user, assistant.
    let roles: Vec<_> = messages.iter().map(|m| m.role()).collect();
    assert_eq!(
        roles,
        vec![Role::User, Role::Assistant, Role::User, Role::Assistant]
    );

    // Each placeholder is finalized with one of the scripted replies.
    for assistant in [&messages[1], &messages[3]] {
        assert!(!assistant.is_streaming());
        assert!(["first reply", "second reply"].contains(&assistant.content()));
    }
    assert_ne!(messages[1].content(), messages[3].content());
}

#[tokio::test]
async fn relays_on_different_conversations_run_independently() {
    let gateway = MockChatGateway::new()
        .with_deltas(["a"])
        .with_deltas(["b"]);
    init_tracing();
    let store = Arc::new(InMemoryMessageStore::new());
    let conv_a = store.create_conversation("a", "m").await.unwrap();
    let conv_b = store.create_conversation("b", "m").await.unwrap();
    let handler = RelayHandler::new(Arc::new(gateway), Arc::clone(&store));

    let (ra, rb) = tokio::join!(
        handler.relay(RelayCommand::new(conv_a, "hi", "m")),
        handler.relay(RelayCommand::new(conv_b, "hi", "m")),
    );
    ra.unwrap();
    rb.unwrap();

    assert_eq!(store.list_messages(conv_a).await.unwrap().len(), 2);
    assert_eq!(store.list_messages(conv_b).await.unwrap().len(), 2);
}

// =============================================================================
// Cancellation
// =============================================================================

#[tokio::test]
async fn cancellation_finalizes_with_the_cancellation_diagnostic() {
    let gateway = MockChatGateway::new()
        .with_deltas(["never", " delivered"])
        .with_delta_delay(Duration::from_secs(5));
    let (handler, store, conversation_id) = setup(gateway).await;

    let (handle, signal) = cancellation();
    let relay = handler.relay_cancellable(
        RelayCommand::new(conversation_id, "Hello", "m"),
        signal,
    );
    let cancel = async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.cancel();
    };

    let (outcome, ()) = tokio::join!(relay, cancel);
    outcome.unwrap();

    let assistant = assistant_message(&store, conversation_id).await;
    assert_eq!(assistant.content(), CANCELLED_DIAGNOSTIC);
    assert!(!assistant.is_streaming());
}

#[tokio::test]
async fn an_unfired_cancel_signal_does_not_disturb_the_relay() {
    let gateway = MockChatGateway::new().with_deltas(["Hi", " there"]);
    let (handler, store, conversation_id) = setup(gateway).await;

    let (_handle, signal) = cancellation();
    handler
        .relay_cancellable(RelayCommand::new(conversation_id, "Hello", "m"), signal)
        .await
        .unwrap();

    let assistant = assistant_message(&store, conversation_id).await;
    assert_eq!(assistant.content(), "Hi there");
}

// =============================================================================
// Custom throttle configuration
// =============================================================================

#[tokio::test]
async fn custom_update_interval_is_honored() {
    let gateway = MockChatGateway::new().with_deltas(["a", "b", "c"]);
    init_tracing();
    let store = Arc::new(InMemoryMessageStore::new());
    let conversation_id = store.create_conversation("t", "m").await.unwrap();
    let handler = RelayHandler::with_config(
        Arc::new(gateway),
        Arc::clone(&store),
        RelayConfig {
            update_interval: Duration::from_secs(3600),
        },
    );

    let listener = Arc::new(SnapshotListener::default());
    let _subscription = store.subscribe(conversation_id, listener.clone());

    handler
        .relay(RelayCommand::new(conversation_id, "Hello", "m"))
        .await
        .unwrap();

    // One patch for the first delta, none for the rest, then the finalize.
    let snapshots = listener.snapshots();
    assert_eq!(snapshots.len(), 4);
    let assistant = assistant_message(&store, conversation_id).await;
    assert_eq!(assistant.content(), "abc");
}
