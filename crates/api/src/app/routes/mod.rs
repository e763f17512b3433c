use axum::{routing::post, Router};

pub mod conversations;
pub mod messages;
pub mod orders;
pub mod system;
pub mod webhook;

/// Router for everything under `/zalo`.
pub fn router() -> Router {
    Router::new()
        .route("/webhook", post(webhook::handle_webhook))
        .route("/send-message", post(messages::send_message))
        .nest("/orders", orders::router())
        .nest("/conversations", conversations::router())
}
