use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_conversations))
        .route("/:user_id", get(get_conversation).delete(delete_conversation))
}

pub async fn list_conversations(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::ConversationsQuery>,
) -> axum::response::Response {
    let state = match query.state.as_deref().filter(|s| !s.trim().is_empty()) {
        Some(raw) => match dto::parse_dialog_state(raw) {
            Ok(s) => Some(s),
            Err(resp) => return resp,
        },
        None => None,
    };

    match services.conversations.list(state).await {
        Ok(conversations) => {
            let items = conversations
                .iter()
                .map(dto::conversation_summary_to_json)
                .collect::<Vec<_>>();
            (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_conversation(
    Extension(services): Extension<Arc<AppServices>>,
    Path(user_id): Path<String>,
) -> axum::response::Response {
    match services.conversations.get(&user_id).await {
        Some(c) => (StatusCode::OK, Json(dto::conversation_to_json(&c))).into_response(),
        None => errors::json_error(StatusCode::NOT_FOUND, "not_found", "conversation not found"),
    }
}

/// Reset a conversation; the user's next message starts from `NEW`.
pub async fn delete_conversation(
    Extension(services): Extension<Arc<AppServices>>,
    Path(user_id): Path<String>,
) -> axum::response::Response {
    if services.conversations.delete(&user_id).await {
        StatusCode::NO_CONTENT.into_response()
    } else {
        errors::json_error(StatusCode::NOT_FOUND, "not_found", "conversation not found")
    }
}
