//! `glasserp-conversation`: the Zalo order-taking conversation.
//!
//! One conversation per Zalo user id, kept in a TTL'd store and driven by a
//! small state machine:
//!
//! ```text
//! NEW ──"Đặt hàng"──▶ WAITING_FOR_PHONE ──phone──▶ WAITING_FOR_PRODUCT_INFO
//!                                                     │ "Kết thúc"
//!                                                     ▼
//!                      (deleted) ◀──"Xác nhận"── CONFIRMING
//! ```
//!
//! plus a CONTACTING_STAFF side path and "Hủy" from anywhere.
//!
//! ## Design
//!
//! - [`intent::classify`] is pure: `(text, state) → Intent`.
//! - [`processor::ConversationProcessor`] owns the transitions and every side
//!   effect (customer lookup, pricing, order creation, staff relay). It never
//!   fails towards the channel: handler errors become a generic apology and
//!   are recorded on the conversation.
//! - [`store::ConversationStore`] serializes writes per user through versioned
//!   compare-and-swap against a pluggable [`store::ConversationBackend`].

pub mod channel;
pub mod intent;
pub mod materializer;
pub mod parser;
pub mod processor;
pub mod replies;
pub mod staff;
pub mod state;
pub mod store;

pub use channel::{LoggingChannel, OutboundChannel};
pub use intent::{Intent, classify};
pub use materializer::OrderMaterializer;
pub use parser::{
    LineItemParser, OrderParser, ParsedItem, ParsedOrder, ParserError, ParserMessage,
    extract_order_window,
};
pub use processor::{ConversationProcessor, ProcessError, Reply};
pub use staff::{BusinessHoursHandoff, HandoffError, StaffContext, StaffHandoff, is_within_business_hours};
pub use state::{ConversationMessage, ConversationState, DialogState, OrderItem, SenderType};
pub use store::{
    ConversationBackend, ConversationStore, InMemoryConversationBackend, StoreError, StoreSettings,
};
