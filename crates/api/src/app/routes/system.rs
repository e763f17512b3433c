use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};

use crate::app::services::AppServices;

/// Liveness plus conversation-store reachability.
pub async fn health(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.conversations.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "healthy",
                "conversation_store": "up",
            })),
        )
            .into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "conversation store health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({
                    "status": "degraded",
                    "conversation_store": "down",
                    "error": e.to_string(),
                })),
            )
                .into_response()
        }
    }
}
