use std::sync::Arc;
use std::time::Duration;

use docchat_memory::{InMemoryMemoryStore, MemoryStore, Message, Role};
use proptest::prelude::*;

proptest! {
    #[test]
    fn window_keeps_the_newest_messages_in_order(cap in 1usize..12, count in 0usize..40) {
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        rt.block_on(async {
            let store = InMemoryMemoryStore::new(cap).unwrap();
            for i in 0..count {
                store.append("c", Message::user(i.to_string())).await;
            }

            let memory = store.get("c").await;
            let kept: Vec<usize> = memory.messages().map(|m| m.content.parse().unwrap()).collect();
            let expected: Vec<usize> = (count.saturating_sub(cap)..count).collect();
            prop_assert_eq!(kept, expected);
            Ok(())
        })?;
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_appends_to_one_conversation_are_linearized() {
    let store = Arc::new(InMemoryMemoryStore::new(1000).unwrap());
    let mut handles = Vec::new();
    for task in 0..8 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            for i in 0..25 {
                store
                    .append_exchange(
                        "shared",
                        Message::user(format!("{task}-{i}")),
                        Message::assistant(format!("{task}-{i}")),
                    )
                    .await;
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let messages: Vec<_> = store.get("shared").await.into_messages();
    assert_eq!(messages.len(), 400);
    // Exchanges never interleave: every user message is directly followed by its reply.
    for pair in messages.chunks(2) {
        assert_eq!(pair[0].role, Role::User);
        assert_eq!(pair[1].role, Role::Assistant);
        assert_eq!(pair[0].content, pair[1].content);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn a_busy_conversation_does_not_block_another() {
    let store = InMemoryMemoryStore::default();
    store.append("busy", Message::user("hold")).await;

    // Read the busy history while another task appends to it, then make sure an
    // unrelated conversation is served promptly.
    let writer = {
        let store = store.clone();
        tokio::spawn(async move {
            for i in 0..500 {
                store.append("busy", Message::user(i.to_string())).await;
            }
        })
    };

    tokio::time::timeout(Duration::from_secs(1), async {
        store.append("other", Message::user("hi")).await;
        assert_eq!(store.get("other").await.len(), 1);
    })
    .await
    .unwrap();

    writer.await.unwrap();
    assert_eq!(store.get("busy").await.len(), 30);
    assert_eq!(store.conversation_count().await, 2);
}
