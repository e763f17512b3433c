use axum::http::StatusCode;
use serde::Deserialize;
use uuid::Uuid;

use glasserp_conversation::{ConversationState, DialogState};
use glasserp_core::ZaloOrderId;
use glasserp_sales::{ZaloOrder, ZaloOrderStatus};

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

/// Zalo OA webhook payload. Only the fields the bot reads are modelled.
#[derive(Debug, Deserialize)]
pub struct ZaloWebhookRequest {
    #[serde(default)]
    pub app_id: String,
    #[serde(default)]
    pub sender: ZaloParticipant,
    #[serde(default)]
    pub recipient: ZaloParticipant,
    #[serde(default)]
    pub event_name: String,
    pub message: Option<ZaloInboundMessage>,
    #[serde(default)]
    pub timestamp: serde_json::Value,
}

#[derive(Debug, Default, Deserialize)]
pub struct ZaloParticipant {
    #[serde(default)]
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct ZaloInboundMessage {
    pub text: Option<String>,
    #[serde(default)]
    pub msg_id: String,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    #[serde(default)]
    pub recipient_id: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateOrderStatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct ConversationsQuery {
    pub state: Option<String>,
}

// -------------------------
// Parsing helpers
// -------------------------

pub fn parse_order_id(raw: &str) -> Result<ZaloOrderId, axum::response::Response> {
    Uuid::parse_str(raw)
        .map(ZaloOrderId::from_uuid)
        .map_err(|_| errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid order id"))
}

pub fn parse_order_status(raw: &str) -> Result<ZaloOrderStatus, axum::response::Response> {
    ZaloOrderStatus::parse(raw).map_err(|_| {
        errors::json_error(
            StatusCode::BAD_REQUEST,
            "invalid_status",
            "status must be one of: pending, confirmed, processing, delivered, cancelled",
        )
    })
}

pub fn parse_dialog_state(raw: &str) -> Result<DialogState, axum::response::Response> {
    DialogState::parse(raw).ok_or_else(|| {
        errors::json_error(
            StatusCode::BAD_REQUEST,
            "invalid_state",
            format!("unknown conversation state `{raw}`"),
        )
    })
}

// -------------------------
// JSON mapping helpers
// -------------------------

pub fn order_to_json(order: &ZaloOrder) -> serde_json::Value {
    let customer = order.customer();
    serde_json::json!({
        "id": order.id_typed().as_uuid().to_string(),
        "order_code": order.order_code(),
        "zalo_user_id": order.zalo_user_id(),
        "customer": {
            "id": customer.customer_id.map(|id| id.as_uuid().to_string()),
            "name": customer.name,
            "phone": customer.phone,
            "address": customer.address,
        },
        "status": order.status().as_str(),
        "order_date": order.order_date().to_rfc3339(),
        "updated_at": order.updated_at().to_rfc3339(),
        "note": order.note(),
        "total_amount": order.total_amount().normalize().to_string(),
        "has_unpriced_lines": order.has_unpriced_lines(),
        "details": order.details().iter().map(|d| serde_json::json!({
            "product_name": d.product_name,
            "product_code": d.product_code,
            "product_type": d.product_type,
            "width": d.width.normalize().to_string(),
            "height": d.height.normalize().to_string(),
            "thickness": d.thickness.normalize().to_string(),
            "quantity": d.quantity,
            "unit_price": d.unit_price.map(|p| p.normalize().to_string()),
            "total_price": d.total_price().map(|p| p.normalize().to_string()),
        })).collect::<Vec<_>>()
    })
}

/// List view: no message history.
pub fn conversation_summary_to_json(c: &ConversationState) -> serde_json::Value {
    serde_json::json!({
        "user_id": c.user_id,
        "current_state": c.current_state.as_str(),
        "customer_phone": c.customer_phone,
        "message_count": c.message_count,
        "order_items": c.order_items.len(),
        "last_activity": c.last_activity.to_rfc3339(),
        "created_at": c.created_at.to_rfc3339(),
        "is_active": c.is_active,
    })
}

pub fn conversation_to_json(c: &ConversationState) -> serde_json::Value {
    let mut value = conversation_summary_to_json(c);
    value["customer_id"] = serde_json::json!(c.customer_id.map(|id| id.as_uuid().to_string()));
    value["last_user_message"] = serde_json::json!(c.last_user_message);
    value["last_bot_response"] = serde_json::json!(c.last_bot_response);
    value["last_error"] = serde_json::json!(c.last_error);
    value["retry_count"] = serde_json::json!(c.retry_count);
    value["version"] = serde_json::json!(c.version);
    value["message_history"] = serde_json::json!(c
        .message_history
        .iter()
        .map(|m| serde_json::json!({
            "content": m.content,
            "sender_type": m.sender,
            "message_type": m.message_type,
            "timestamp": m.timestamp.to_rfc3339(),
        }))
        .collect::<Vec<_>>());
    value
}
