//! # docchat-memory
//!
//! Bounded, per-conversation message history.
//!
//! Each conversation keeps its most recent messages (30 by default); older
//! ones are evicted first. Access to one conversation is serialized while
//! different conversations proceed independently.
//!
//! ```rust
//! use docchat_memory::{InMemoryMemoryStore, MemoryStore, Message};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let store = InMemoryMemoryStore::default();
//! store.append_exchange("c1", Message::user("Hi"), Message::assistant("Hello!")).await;
//! assert_eq!(store.get("c1").await.len(), 2);
//! # }
//! ```

pub mod error;
pub mod message;
pub mod store;

pub use error::{MemoryError, Result};
pub use message::{ConversationId, ConversationMemory, Message, Role};
pub use store::{DEFAULT_MAX_MESSAGES, InMemoryMemoryStore, MemoryStore};
