//! HTTP API: Zalo webhook, order and conversation endpoints, and the wiring
//! that connects them to the conversation engine.

pub mod app;
pub mod config;
