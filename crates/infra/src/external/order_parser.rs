//! Client for the external order-parsing service.
//!
//! The service takes the order window of a conversation as a JSON array of
//! messages and answers with `{"items": [...]}`.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, instrument, warn};

use glasserp_conversation::{OrderParser, ParsedOrder, ParserError, ParserMessage};

use super::http_client;

#[derive(Debug, Clone)]
pub struct HttpOrderParser {
    client: reqwest::Client,
    url: String,
}

impl HttpOrderParser {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: http_client(timeout),
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl OrderParser for HttpOrderParser {
    #[instrument(skip(self, messages), fields(url = %self.url, messages = messages.len()), err)]
    async fn parse(&self, messages: &[ParserMessage]) -> Result<ParsedOrder, ParserError> {
        let resp = self
            .client
            .post(&self.url)
            .json(messages)
            .send()
            .await
            .map_err(|e| ParserError::Unavailable(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), %body, "order parser rejected request");
            return Err(ParserError::Status(status.as_u16()));
        }

        let parsed: ParsedOrder = resp
            .json()
            .await
            .map_err(|e| ParserError::Decode(e.to_string()))?;
        debug!(items = parsed.items.len(), "order parsed");
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use glasserp_conversation::SenderType;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn window() -> Vec<ParserMessage> {
        vec![
            ParserMessage {
                sender_id: "u1".into(),
                sender_type: SenderType::User,
                message_type: "text".into(),
                content: "Đặt hàng".into(),
                time: Utc::now(),
            },
            ParserMessage {
                sender_id: "u1".into(),
                sender_type: SenderType::User,
                message_type: "text".into(),
                content: "EI90 MB 1000*2000*25mm 2".into(),
                time: Utc::now(),
            },
        ]
    }

    #[tokio::test]
    async fn posts_the_window_and_decodes_items() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/process_zalo_chat"))
            .and(body_partial_json(json!([{ "content": "Đặt hàng" }])))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{
                    "itemCode": "EI90",
                    "itemType": "MB",
                    "width": 1000,
                    "height": 2000,
                    "thickness": 25,
                    "quantity": 2
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let parser = HttpOrderParser::new(
            format!("{}/process_zalo_chat", server.uri()),
            Duration::from_secs(5),
        );
        let order = parser.parse(&window()).await.unwrap();
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].item_code, "EI90");
        assert_eq!(order.items[0].width, dec!(1000));
        assert_eq!(order.items[0].quantity, 2);
    }

    #[tokio::test]
    async fn missing_items_decode_as_empty_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let parser = HttpOrderParser::new(server.uri(), Duration::from_secs(5));
        assert!(parser.parse(&window()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn error_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let parser = HttpOrderParser::new(server.uri(), Duration::from_secs(5));
        assert!(matches!(
            parser.parse(&window()).await,
            Err(ParserError::Status(503))
        ));
    }

    #[tokio::test]
    async fn garbage_body_is_a_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let parser = HttpOrderParser::new(server.uri(), Duration::from_secs(5));
        assert!(matches!(
            parser.parse(&window()).await,
            Err(ParserError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn unreachable_service_is_unavailable() {
        let parser = HttpOrderParser::new("http://127.0.0.1:1/process", Duration::from_secs(1));
        assert!(matches!(
            parser.parse(&window()).await,
            Err(ParserError::Unavailable(_))
        ));
    }
}
