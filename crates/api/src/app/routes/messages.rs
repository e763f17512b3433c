use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};

use crate::app::dto::SendMessageRequest;
use crate::app::services::AppServices;

/// Manual outbound message, e.g. staff answering a relayed question.
pub async fn send_message(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<SendMessageRequest>,
) -> axum::response::Response {
    if body.recipient_id.trim().is_empty() || body.message.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "success": false,
                "message": "recipient_id and message are required",
            })),
        )
            .into_response();
    }

    if services
        .channel
        .send_text(body.recipient_id.trim(), &body.message)
        .await
    {
        (
            StatusCode::OK,
            Json(serde_json::json!({ "success": true, "message": "Message sent successfully" })),
        )
            .into_response()
    } else {
        (
            StatusCode::BAD_GATEWAY,
            Json(serde_json::json!({ "success": false, "message": "Failed to send message" })),
        )
            .into_response()
    }
}
