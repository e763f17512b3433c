use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use glasserp_core::{CustomerId, Versioned};

use crate::parser::ParsedOrder;

/// Where a conversation is in the ordering flow.
///
/// `Inquiry` and `Ordering` exist in stored data but no transition enters
/// them; they behave like `New`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DialogState {
    New,
    WaitingForPhone,
    WaitingForProductInfo,
    Confirming,
    ContactingStaff,
    Completed,
    Cancelled,
    Inquiry,
    Ordering,
}

impl DialogState {
    pub fn as_str(self) -> &'static str {
        match self {
            DialogState::New => "NEW",
            DialogState::WaitingForPhone => "WAITING_FOR_PHONE",
            DialogState::WaitingForProductInfo => "WAITING_FOR_PRODUCT_INFO",
            DialogState::Confirming => "CONFIRMING",
            DialogState::ContactingStaff => "CONTACTING_STAFF",
            DialogState::Completed => "COMPLETED",
            DialogState::Cancelled => "CANCELLED",
            DialogState::Inquiry => "INQUIRY",
            DialogState::Ordering => "ORDERING",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let state = match raw.trim().to_ascii_uppercase().as_str() {
            "NEW" => DialogState::New,
            "WAITING_FOR_PHONE" => DialogState::WaitingForPhone,
            "WAITING_FOR_PRODUCT_INFO" => DialogState::WaitingForProductInfo,
            "CONFIRMING" => DialogState::Confirming,
            "CONTACTING_STAFF" => DialogState::ContactingStaff,
            "COMPLETED" => DialogState::Completed,
            "CANCELLED" => DialogState::Cancelled,
            "INQUIRY" => DialogState::Inquiry,
            "ORDERING" => DialogState::Ordering,
            _ => return None,
        };
        Some(state)
    }
}

impl core::fmt::Display for DialogState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SenderType {
    User,
    Business,
}

/// One entry of the conversation log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub content: String,
    pub sender: SenderType,
    pub message_type: String,
    pub timestamp: DateTime<Utc>,
}

impl ConversationMessage {
    pub fn text(content: impl Into<String>, sender: SenderType, timestamp: DateTime<Utc>) -> Self {
        Self {
            content: content.into(),
            sender,
            message_type: "text".to_string(),
            timestamp,
        }
    }

    pub fn is_user(&self) -> bool {
        self.sender == SenderType::User
    }
}

/// A priced glass pane requested in the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_code: String,
    pub product_type: String,
    pub width: Decimal,
    pub height: Decimal,
    pub thickness: Decimal,
    pub quantity: u32,
    /// `None` when the pane could not be priced.
    pub unit_price: Option<Decimal>,
}

impl OrderItem {
    /// `None` when unpriced or when the line total does not fit in a `Decimal`.
    pub fn total_price(&self) -> Option<Decimal> {
        self.unit_price?.checked_mul(Decimal::from(self.quantity))
    }
}

/// Everything the bot remembers about one Zalo user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationState {
    pub user_id: String,
    pub current_state: DialogState,
    pub customer_phone: Option<String>,
    pub customer_id: Option<CustomerId>,
    #[serde(default)]
    pub message_history: Vec<ConversationMessage>,
    pub last_user_message: Option<String>,
    pub last_bot_response: Option<String>,
    pub last_error: Option<String>,
    #[serde(default)]
    pub retry_count: u32,
    pub last_parsed_order: Option<ParsedOrder>,
    #[serde(default)]
    pub order_items: Vec<OrderItem>,
    #[serde(default)]
    pub message_count: u32,
    pub last_activity: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub is_active: bool,
    #[serde(default)]
    pub version: u64,
}

impl ConversationState {
    pub fn new(user_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.into(),
            current_state: DialogState::New,
            customer_phone: None,
            customer_id: None,
            message_history: Vec::new(),
            last_user_message: None,
            last_bot_response: None,
            last_error: None,
            retry_count: 0,
            last_parsed_order: None,
            order_items: Vec::new(),
            message_count: 0,
            last_activity: now,
            created_at: now,
            is_active: true,
            version: 0,
        }
    }

    pub fn record_user_message(&mut self, text: &str, at: DateTime<Utc>) {
        self.message_history
            .push(ConversationMessage::text(text, SenderType::User, at));
        self.last_user_message = Some(text.to_string());
        self.message_count += 1;
    }

    pub fn record_bot_message(&mut self, text: &str, at: DateTime<Utc>) {
        self.message_history
            .push(ConversationMessage::text(text, SenderType::Business, at));
        self.last_bot_response = Some(text.to_string());
    }

    pub fn record_failure(&mut self, error: &str) {
        self.last_error = Some(error.to_string());
        self.retry_count += 1;
    }

    /// Keep only the most recent `limit` history entries.
    pub fn truncate_history(&mut self, limit: usize) {
        if self.message_history.len() > limit {
            let excess = self.message_history.len() - limit;
            self.message_history.drain(..excess);
        }
    }
}

impl Versioned for ConversationState {
    fn version(&self) -> u64 {
        self.version
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_conversation_starts_active_in_new_state() {
        let now = Utc::now();
        let c = ConversationState::new("u1", now);
        assert_eq!(c.current_state, DialogState::New);
        assert!(c.is_active);
        assert_eq!(c.created_at, now);
        assert_eq!(c.version, 0);
    }

    #[test]
    fn recording_messages_updates_history_and_counters() {
        let now = Utc::now();
        let mut c = ConversationState::new("u1", now);
        c.record_user_message("Đặt hàng", now);
        c.record_bot_message("Vui lòng nhập số điện thoại", now);

        assert_eq!(c.message_count, 1);
        assert_eq!(c.message_history.len(), 2);
        assert!(c.message_history[0].is_user());
        assert_eq!(c.last_user_message.as_deref(), Some("Đặt hàng"));
        assert_eq!(c.last_bot_response.as_deref(), Some("Vui lòng nhập số điện thoại"));
    }

    #[test]
    fn truncation_keeps_the_newest_entries() {
        let now = Utc::now();
        let mut c = ConversationState::new("u1", now);
        for i in 0..10 {
            c.record_user_message(&format!("m{i}"), now);
        }
        c.truncate_history(3);
        let contents: Vec<_> = c.message_history.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["m7", "m8", "m9"]);
    }

    #[test]
    fn dialog_state_uses_upper_snake_case_on_the_wire() {
        let json = serde_json::to_string(&DialogState::WaitingForProductInfo).unwrap();
        assert_eq!(json, "\"WAITING_FOR_PRODUCT_INFO\"");
        assert_eq!(DialogState::parse("waiting_for_phone"), Some(DialogState::WaitingForPhone));
        assert_eq!(DialogState::parse("bogus"), None);
    }
}
