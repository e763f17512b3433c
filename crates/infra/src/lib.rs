//! Infrastructure layer: Redis, Postgres and the HTTP services the chatbot
//! talks to.

#[cfg(feature = "redis")]
pub mod conversation_store;

/// Postgres repositories for customers, glass structures and Zalo orders.
pub mod db;

/// External service clients (order parser, Zalo OA).
pub mod external;
