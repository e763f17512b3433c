use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use glasserp_conversation::StoreError;
use glasserp_core::DomainError;
use glasserp_sales::OrderRepositoryError;

pub fn order_error_to_response(err: OrderRepositoryError) -> axum::response::Response {
    match err {
        OrderRepositoryError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "order not found"),
        OrderRepositoryError::DuplicateCode(code) => json_error(
            StatusCode::CONFLICT,
            "duplicate_order_code",
            format!("order code {code} already exists"),
        ),
        OrderRepositoryError::Domain(e) => domain_error_to_response(e),
        OrderRepositoryError::Storage(msg) => {
            tracing::error!(error = %msg, "order storage failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "storage_error", msg)
        }
    }
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        DomainError::InvariantViolation(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invariant_violation", msg)
        }
        DomainError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        DomainError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
    }
}

pub fn store_error_to_response(err: StoreError) -> axum::response::Response {
    match err {
        StoreError::Unavailable(msg) => {
            json_error(StatusCode::SERVICE_UNAVAILABLE, "store_unavailable", msg)
        }
        StoreError::Conflict { user_id, .. } => json_error(
            StatusCode::CONFLICT,
            "conflict",
            format!("conversation {user_id} was modified concurrently"),
        ),
        StoreError::Serialization(msg) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "serialization_error", msg)
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
