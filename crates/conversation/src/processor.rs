//! The conversation state machine.
//!
//! Every inbound text goes through the same turn:
//!
//! 1. load (or create) the conversation and append the message to its history;
//! 2. classify the message against the current state;
//! 3. run the handler for the intent, which performs its side effects and
//!    persists its transition;
//! 4. append a non-empty reply to the history.
//!
//! Handlers may fail (order parser down, order storage failing, staff relay
//! broken). The failure is logged, stored on the conversation as
//! `last_error` with `retry_count` incremented, and the customer gets the
//! generic apology. [`ConversationProcessor::process_message`] itself never
//! fails.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, instrument, warn};

use glasserp_parties::{CustomerLookup, normalize_phone};
use glasserp_sales::OrderRepositoryError;

use crate::intent::{Intent, classify};
use crate::materializer::OrderMaterializer;
use crate::parser::{OrderParser, ParserError, ParserMessage, extract_order_window};
use crate::replies;
use crate::staff::{HandoffError, StaffContext, StaffHandoff};
use crate::state::{ConversationState, DialogState};
use crate::store::ConversationStore;

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error(transparent)]
    Parser(#[from] ParserError),

    #[error(transparent)]
    Order(#[from] OrderRepositoryError),

    #[error(transparent)]
    Handoff(#[from] HandoffError),
}

/// Outcome of one turn. An empty `text` means "send nothing".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reply {
    pub intent: Intent,
    pub text: String,
}

impl Reply {
    fn new(intent: Intent, text: impl Into<String>) -> Self {
        Self {
            intent,
            text: text.into(),
        }
    }

    fn silent(intent: Intent) -> Self {
        Self::new(intent, String::new())
    }

    pub fn is_silent(&self) -> bool {
        self.text.is_empty()
    }
}

#[derive(Clone)]
pub struct ConversationProcessor {
    store: ConversationStore,
    customers: CustomerLookup,
    parser: Arc<dyn OrderParser>,
    materializer: OrderMaterializer,
    staff: Arc<dyn StaffHandoff>,
}

impl ConversationProcessor {
    pub fn new(
        store: ConversationStore,
        customers: CustomerLookup,
        parser: Arc<dyn OrderParser>,
        materializer: OrderMaterializer,
        staff: Arc<dyn StaffHandoff>,
    ) -> Self {
        Self {
            store,
            customers,
            parser,
            materializer,
            staff,
        }
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    #[instrument(
        skip(self, message),
        fields(state = tracing::field::Empty, intent = tracing::field::Empty)
    )]
    pub async fn process_message(&self, user_id: &str, message: &str) -> Reply {
        let text = message.trim().to_string();
        let received_at = Utc::now();

        let fallback = self.store.get_or_create(user_id).await;
        let conversation = self
            .store
            .modify(user_id, |c| c.record_user_message(&text, received_at))
            .await
            .unwrap_or_else(|| {
                let mut c = fallback.clone();
                c.record_user_message(&text, received_at);
                c
            });

        let intent = classify(&text, conversation.current_state);
        let span = tracing::Span::current();
        span.record("state", conversation.current_state.as_str());
        span.record("intent", tracing::field::debug(intent));

        match self.handle(intent, &conversation, &text).await {
            Ok(reply) => {
                if !reply.is_silent() {
                    let answered_at = Utc::now();
                    self.store
                        .update_fields(user_id, |c| c.record_bot_message(&reply.text, answered_at))
                        .await;
                }
                reply
            }
            Err(e) => {
                error!(error = %e, "conversation handler failed");
                let failure = e.to_string();
                let answered_at = Utc::now();
                self.store
                    .update_fields(user_id, |c| {
                        c.record_failure(&failure);
                        c.record_bot_message(replies::ERROR_MESSAGE, answered_at);
                    })
                    .await;
                Reply::new(intent, replies::ERROR_MESSAGE)
            }
        }
    }

    async fn handle(
        &self,
        intent: Intent,
        conversation: &ConversationState,
        text: &str,
    ) -> Result<Reply, ProcessError> {
        let user_id = conversation.user_id.as_str();
        match intent {
            Intent::Cancel => {
                self.store.delete(user_id).await;
                Ok(Reply::new(intent, replies::CANCELLED))
            }
            Intent::PlaceOrder => {
                self.store
                    .update_state(user_id, DialogState::WaitingForPhone)
                    .await;
                Ok(Reply::new(intent, replies::ASK_PHONE))
            }
            Intent::PhoneNumber => Ok(self.handle_phone(conversation, text).await),
            Intent::AddOrderDetail => {
                self.store
                    .update_fields(user_id, |c| {
                        c.current_state = DialogState::WaitingForProductInfo;
                        c.last_parsed_order = None;
                    })
                    .await;
                Ok(Reply::new(intent, replies::PRODUCT_NOTED))
            }
            Intent::FinishOrder => self.handle_finish(conversation).await,
            Intent::ConfirmOrder => self.handle_confirm(conversation).await,
            Intent::ContactStaff => self.handle_staff(conversation, text).await,
            Intent::EndStaffContact => {
                self.store.update_state(user_id, DialogState::New).await;
                Ok(Reply::new(intent, replies::STAFF_ENDED))
            }
            Intent::Unknown => Ok(Reply::new(intent, unknown_reply(conversation.current_state))),
        }
    }

    async fn handle_phone(&self, conversation: &ConversationState, text: &str) -> Reply {
        let user_id = conversation.user_id.as_str();
        let phone = normalize_phone(text);

        match self.customers.get_by_phone(&phone).await {
            Some(customer) => {
                let customer_id = customer.id_typed();
                self.store
                    .update_fields(user_id, |c| {
                        c.customer_phone = Some(phone.clone());
                        c.customer_id = Some(customer_id);
                        c.current_state = DialogState::WaitingForProductInfo;
                    })
                    .await;
                info!(%customer_id, "customer identified by phone");
                Reply::new(Intent::PhoneNumber, replies::customer_found(customer.name()))
            }
            None => {
                self.store
                    .update_fields(user_id, |c| {
                        c.customer_phone = Some(phone.clone());
                        c.customer_id = None;
                        c.current_state = DialogState::New;
                    })
                    .await;
                Reply::new(Intent::PhoneNumber, replies::CUSTOMER_NOT_FOUND)
            }
        }
    }

    async fn handle_finish(&self, conversation: &ConversationState) -> Result<Reply, ProcessError> {
        let intent = Intent::FinishOrder;
        let Some(window) = extract_order_window(&conversation.message_history) else {
            return Ok(Reply::new(intent, replies::NO_ORDER_HISTORY));
        };

        let messages: Vec<ParserMessage> = window
            .iter()
            .map(|m| ParserMessage::from_history(&conversation.user_id, m))
            .collect();
        let mut parsed = self.parser.parse(&messages).await?;
        let dropped = parsed.retain_within_limits();
        if dropped > 0 {
            warn!(dropped, "discarding parsed items outside accepted limits");
        }

        if parsed.is_empty() {
            return Ok(Reply::new(intent, replies::no_products_recognized()));
        }

        let summary = replies::order_summary(
            &parsed.items,
            conversation.customer_phone.as_deref(),
            conversation.customer_id.is_some(),
        );
        self.store
            .update_fields(&conversation.user_id, |c| {
                c.last_parsed_order = Some(parsed.clone());
                c.current_state = DialogState::Confirming;
            })
            .await;
        Ok(Reply::new(intent, summary))
    }

    async fn handle_confirm(&self, conversation: &ConversationState) -> Result<Reply, ProcessError> {
        let intent = Intent::ConfirmOrder;
        let items = match &conversation.last_parsed_order {
            Some(order) if !order.is_empty() => order.items.clone(),
            _ => return Ok(Reply::new(intent, replies::NO_ORDER_INFO)),
        };

        let priced = self.materializer.price_items(&items).await;
        let mut completed = conversation.clone();
        completed.order_items.extend(priced);
        completed.current_state = DialogState::Completed;

        // The stored record stays in CONFIRMING until the order is persisted.
        let order = self.materializer.materialize(&completed).await?;
        self.store.delete(&conversation.user_id).await;
        Ok(Reply::new(intent, replies::order_confirmed(&order)))
    }

    async fn handle_staff(
        &self,
        conversation: &ConversationState,
        text: &str,
    ) -> Result<Reply, ProcessError> {
        let intent = Intent::ContactStaff;

        if conversation.current_state == DialogState::ContactingStaff {
            let context = StaffContext {
                customer_phone: conversation.customer_phone.clone(),
                customer_id: conversation.customer_id,
                state: conversation.current_state,
            };
            self.staff
                .forward(&conversation.user_id, text, &context)
                .await?;
            return Ok(Reply::silent(intent));
        }

        if !self.staff.is_available() {
            return Ok(Reply::new(intent, replies::staff_unavailable()));
        }

        self.store
            .update_state(&conversation.user_id, DialogState::ContactingStaff)
            .await;
        Ok(Reply::new(intent, replies::STAFF_CONNECTED))
    }
}

fn unknown_reply(state: DialogState) -> String {
    match state {
        DialogState::WaitingForPhone => replies::INVALID_PHONE.to_string(),
        DialogState::WaitingForProductInfo => replies::PRODUCT_FORMAT_HINT.to_string(),
        DialogState::New
        | DialogState::Confirming
        | DialogState::ContactingStaff
        | DialogState::Completed
        | DialogState::Cancelled
        | DialogState::Inquiry
        | DialogState::Ordering => replies::HELP_MENU.to_string(),
    }
}
