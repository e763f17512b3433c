//! Conversation backends backed by external stores.

pub mod redis;

pub use self::redis::{RedisConversationBackend, RedisConversationError};
