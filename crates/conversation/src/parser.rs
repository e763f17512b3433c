//! Turning the free-text order window of a conversation into structured items.
//!
//! The window runs from the first user "Đặt hàng" to the last user "Kết thúc",
//! inclusive. Parsing itself sits behind [`OrderParser`]: production uses the
//! external order-parsing service (see `glasserp-infra`), dev and tests can use
//! the rule-based [`LineItemParser`].

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::intent::{FINISH_ORDER_KEYWORD, PLACE_ORDER_KEYWORD, is_keyword};
use crate::state::{ConversationMessage, SenderType};

/// One requested pane as understood by the parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedItem {
    #[serde(alias = "itemCode")]
    pub item_code: String,
    #[serde(alias = "itemType")]
    pub item_type: String,
    pub width: Decimal,
    pub height: Decimal,
    pub thickness: Decimal,
    pub quantity: u32,
}

/// Largest accepted width, height or thickness, in mm.
pub const MAX_DIMENSION_MM: u32 = 100_000;
/// Largest accepted quantity for one line.
pub const MAX_QUANTITY: u32 = 10_000;

impl ParsedItem {
    /// Positive dimensions and quantity, none of them above the accepted maximum.
    pub fn is_within_limits(&self) -> bool {
        let max = Decimal::from(MAX_DIMENSION_MM);
        let dimension_ok = |d: Decimal| d > Decimal::ZERO && d <= max;
        dimension_ok(self.width)
            && dimension_ok(self.height)
            && dimension_ok(self.thickness)
            && (1..=MAX_QUANTITY).contains(&self.quantity)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedOrder {
    #[serde(default)]
    pub items: Vec<ParsedItem>,
}

impl ParsedOrder {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Drops items outside [`ParsedItem::is_within_limits`], returning how many.
    pub fn retain_within_limits(&mut self) -> usize {
        let before = self.items.len();
        self.items.retain(ParsedItem::is_within_limits);
        before - self.items.len()
    }
}

/// A history entry as sent to the parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParserMessage {
    pub sender_id: String,
    pub sender_type: SenderType,
    pub message_type: String,
    pub content: String,
    pub time: DateTime<Utc>,
}

impl ParserMessage {
    pub fn from_history(user_id: &str, message: &ConversationMessage) -> Self {
        Self {
            sender_id: match message.sender {
                SenderType::User => user_id.to_string(),
                SenderType::Business => "business".to_string(),
            },
            sender_type: message.sender,
            message_type: message.message_type.clone(),
            content: message.content.clone(),
            time: message.timestamp,
        }
    }
}

#[derive(Debug, Error)]
pub enum ParserError {
    #[error("order parser unavailable: {0}")]
    Unavailable(String),

    #[error("order parser returned an error status: {0}")]
    Status(u16),

    #[error("order parser response could not be decoded: {0}")]
    Decode(String),
}

#[async_trait]
pub trait OrderParser: Send + Sync {
    async fn parse(&self, messages: &[ParserMessage]) -> Result<ParsedOrder, ParserError>;
}

#[async_trait]
impl<S> OrderParser for Arc<S>
where
    S: OrderParser + ?Sized,
{
    async fn parse(&self, messages: &[ParserMessage]) -> Result<ParsedOrder, ParserError> {
        (**self).parse(messages).await
    }
}

/// The slice of `history` that describes the current order, if any.
///
/// Requires a user "Kết thúc". When the opening "Đặt hàng" has been trimmed
/// out of a capped history the window starts at the oldest retained entry.
pub fn extract_order_window(history: &[ConversationMessage]) -> Option<&[ConversationMessage]> {
    let end = history
        .iter()
        .rposition(|m| m.is_user() && is_keyword(&m.content, FINISH_ORDER_KEYWORD))?;
    let start = history[..=end]
        .iter()
        .position(|m| m.is_user() && is_keyword(&m.content, PLACE_ORDER_KEYWORD))
        .unwrap_or(0);
    Some(&history[start..=end])
}

static LINE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^([a-z0-9]{2,})\s+([a-z]{1,2})\s+(\d+(?:\.\d+)?)\s*[*x×]\s*(\d+(?:\.\d+)?)\s*[*x×]\s*(\d+(?:\.\d+)?)\s*mm\s+(\d+)$",
    )
    .expect("line item pattern is a valid regex")
});

/// Rule-based parser for lines like `EI90 MB 1000*2000*25mm 2`
/// (code, type, width*height*thickness in mm, quantity).
///
/// A message may hold several lines separated by newlines, commas or
/// semicolons. Anything that does not look like a line item is skipped.
#[derive(Debug, Clone, Default)]
pub struct LineItemParser;

impl LineItemParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse_line(line: &str) -> Option<ParsedItem> {
        let caps = LINE_PATTERN.captures(line.trim())?;
        let item = ParsedItem {
            item_code: caps[1].to_uppercase(),
            item_type: caps[2].to_uppercase(),
            width: caps[3].parse().ok()?,
            height: caps[4].parse().ok()?,
            thickness: caps[5].parse().ok()?,
            quantity: caps[6].parse().ok()?,
        };
        item.is_within_limits().then_some(item)
    }

    pub fn parse_text(text: &str) -> Vec<ParsedItem> {
        text.split(['\n', ',', ';'])
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .filter_map(|segment| {
                let item = Self::parse_line(segment);
                if item.is_none() {
                    debug!(segment, "skipping non line-item text");
                }
                item
            })
            .collect()
    }
}

#[async_trait]
impl OrderParser for LineItemParser {
    async fn parse(&self, messages: &[ParserMessage]) -> Result<ParsedOrder, ParserError> {
        let items = messages
            .iter()
            .filter(|m| m.sender_type == SenderType::User)
            .flat_map(|m| Self::parse_text(&m.content))
            .collect();
        Ok(ParsedOrder { items })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn user(text: &str) -> ConversationMessage {
        ConversationMessage::text(text, SenderType::User, Utc::now())
    }

    fn bot(text: &str) -> ConversationMessage {
        ConversationMessage::text(text, SenderType::Business, Utc::now())
    }

    fn contents(window: &[ConversationMessage]) -> Vec<&str> {
        window.iter().map(|m| m.content.as_str()).collect()
    }

    #[test]
    fn window_spans_from_order_start_to_finish() {
        let history = vec![
            user("Xin chào"),
            bot("Chào bạn"),
            user("Đặt hàng"),
            bot("Số điện thoại?"),
            user("0912345678"),
            user("EI90 MB 1000*2000*25mm 2"),
            user("Kết thúc"),
            bot("Tóm tắt"),
        ];
        let window = extract_order_window(&history).unwrap();
        assert_eq!(
            contents(window),
            ["Đặt hàng", "Số điện thoại?", "0912345678", "EI90 MB 1000*2000*25mm 2", "Kết thúc"]
        );
    }

    #[test]
    fn window_extends_to_the_latest_finish_marker() {
        let history = vec![
            user("Đặt hàng"),
            user("EI90 MB 1000*2000*25mm 2"),
            user("Kết thúc"),
            user("EI60 MB 500*500*20mm 1"),
            user("Kết thúc"),
        ];
        let window = extract_order_window(&history).unwrap();
        assert_eq!(window.len(), 5);
    }

    #[test]
    fn bot_messages_do_not_count_as_markers() {
        let history = vec![user("Đặt hàng"), bot("Kết thúc")];
        assert!(extract_order_window(&history).is_none());
    }

    #[test]
    fn trimmed_history_without_start_marker_starts_at_oldest_entry() {
        let history = vec![user("EI90 MB 1000*2000*25mm 2"), user("Kết thúc")];
        assert_eq!(extract_order_window(&history).unwrap().len(), 2);
    }

    #[test]
    fn parses_a_single_line_item() {
        let item = LineItemParser::parse_line("EI90 MB 1000*2000*25mm 2").unwrap();
        assert_eq!(
            item,
            ParsedItem {
                item_code: "EI90".into(),
                item_type: "MB".into(),
                width: dec!(1000),
                height: dec!(2000),
                thickness: dec!(25),
                quantity: 2,
            }
        );
    }

    #[test]
    fn accepts_lowercase_and_x_separators() {
        let item = LineItemParser::parse_line("ei60 k 500x750.5x8 mm 3").unwrap();
        assert_eq!(item.item_code, "EI60");
        assert_eq!(item.item_type, "K");
        assert_eq!(item.height, dec!(750.5));
        assert_eq!(item.quantity, 3);
    }

    #[test]
    fn rejects_malformed_lines() {
        for line in [
            "Xin chào",
            "E MB 1000*2000*25mm 2",
            "EI90 MBX 1000*2000*25mm 2",
            "EI90 MB 1000*2000mm 2",
            "EI90 MB 1000*2000*25mm 0",
            "EI90 MB 0*2000*25mm 1",
            "EI90 MB 99999999999999999999999*99999999999999999999999*25mm 1",
            "EI90 MB 100001*2000*25mm 1",
            "EI90 MB 1000*2000*25mm 10001",
            "EI90 MB 1000*2000*25mm 99999999999",
        ] {
            assert!(LineItemParser::parse_line(line).is_none(), "{line:?}");
        }
    }

    #[test]
    fn largest_accepted_pane_is_parsed() {
        let item = LineItemParser::parse_line("EI90 MB 100000*100000*25mm 10000").unwrap();
        assert_eq!(item.width, dec!(100000));
        assert_eq!(item.quantity, MAX_QUANTITY);
    }

    #[test]
    fn out_of_range_items_are_dropped_from_a_parsed_order() {
        let json = r#"{"items":[
            {"item_code":"EI90","item_type":"MB","width":1000,"height":2000,"thickness":25,"quantity":2},
            {"item_code":"EI90","item_type":"MB","width":100000000000,"height":2000,"thickness":25,"quantity":1},
            {"item_code":"EI60","item_type":"MB","width":500,"height":500,"thickness":20,"quantity":0}
        ]}"#;
        let mut order: ParsedOrder = serde_json::from_str(json).unwrap();
        assert_eq!(order.retain_within_limits(), 2);
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].quantity, 2);
    }

    #[test]
    fn splits_messages_on_newline_comma_and_semicolon() {
        let items = LineItemParser::parse_text(
            "EI90 MB 1000*2000*25mm 2, EI60 MB 500*500*20mm 1\nCL8 K 800*1200*8mm 4; hello",
        );
        assert_eq!(items.len(), 3);
        assert_eq!(items[2].item_code, "CL8");
    }

    #[tokio::test]
    async fn line_parser_reads_only_user_messages() {
        let now = Utc::now();
        let messages = vec![
            ParserMessage::from_history("u1", &ConversationMessage::text("Đặt hàng", SenderType::User, now)),
            ParserMessage::from_history(
                "u1",
                &ConversationMessage::text("EI90 MB 1000*2000*25mm 2", SenderType::Business, now),
            ),
            ParserMessage::from_history(
                "u1",
                &ConversationMessage::text("EI60 MB 500*500*20mm 1", SenderType::User, now),
            ),
        ];
        let order = LineItemParser::new().parse(&messages).await.unwrap();
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].item_code, "EI60");
        assert_eq!(messages[1].sender_id, "business");
    }

    #[test]
    fn parsed_items_accept_numeric_json_and_camel_case_keys() {
        let json = r#"{"items":[{"itemCode":"EI90","itemType":"MB","width":1000,"height":2000.5,"thickness":25,"quantity":2}]}"#;
        let order: ParsedOrder = serde_json::from_str(json).unwrap();
        assert_eq!(order.items[0].height, dec!(2000.5));
        assert_eq!(order.items[0].item_code, "EI90");
    }
}
