//! Zalo OA webhook: one inbound event per request.

use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use tracing::{error, info, instrument, warn};

use glasserp_conversation::replies;

use crate::app::dto::ZaloWebhookRequest;
use crate::app::services::AppServices;

pub const USER_SEND_TEXT: &str = "user_send_text";

fn webhook_response(status: StatusCode, outcome: &str, message: impl Into<String>) -> axum::response::Response {
    (
        status,
        Json(serde_json::json!({
            "status": outcome,
            "message": message.into(),
        })),
    )
        .into_response()
}

#[instrument(
    skip(services, body),
    fields(event = %body.event_name, user_id = %body.sender.id, app_id = %body.app_id)
)]
pub async fn handle_webhook(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<ZaloWebhookRequest>,
) -> axum::response::Response {
    let event_name = body.event_name.trim().to_lowercase();
    let user_id = body.sender.id.trim().to_string();
    if event_name.is_empty() || user_id.is_empty() {
        warn!("invalid webhook request");
        return webhook_response(StatusCode::BAD_REQUEST, "error", "Invalid request data");
    }

    if event_name != USER_SEND_TEXT {
        warn!(event = %event_name, "unsupported webhook event");
        if !services
            .channel
            .send_text(&user_id, &replies::unsupported_event())
            .await
        {
            error!("failed to send unsupported-event notice");
        }
        return webhook_response(
            StatusCode::OK,
            "ignored",
            format!("Event type '{event_name}' not supported - only text messages are handled"),
        );
    }

    let text = body
        .message
        .and_then(|m| m.text)
        .filter(|t| !t.trim().is_empty());
    let Some(text) = text else {
        return webhook_response(StatusCode::OK, "error", "No text content");
    };

    let reply = services.processor.process_message(&user_id, &text).await;
    if !reply.is_silent() && !services.channel.send_text(&user_id, &reply.text).await {
        error!(intent = ?reply.intent, "failed to deliver reply");
    }
    info!(intent = ?reply.intent, "text message processed");

    webhook_response(StatusCode::OK, "success", "Text message processed")
}
