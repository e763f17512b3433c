//! Zalo Official Account messaging client.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, instrument, warn};

use glasserp_conversation::OutboundChannel;

use super::http_client;

pub const DEFAULT_ZALO_SEND_URL: &str = "https://openapi.zalo.me/v3.0/oa/message/cs";

#[derive(Debug, Error)]
pub enum TokenStoreError {
    #[error("token store unavailable: {0}")]
    Unavailable(String),
}

/// Source of the OA access token used for outbound calls.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn access_token(&self) -> Result<Option<String>, TokenStoreError>;
}

/// Token fixed at startup (e.g. from `ZALO_ACCESS_TOKEN`).
#[derive(Debug, Clone, Default)]
pub struct StaticTokenStore {
    token: Option<String>,
}

impl StaticTokenStore {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: token.filter(|t| !t.trim().is_empty()),
        }
    }
}

#[async_trait]
impl TokenStore for StaticTokenStore {
    async fn access_token(&self) -> Result<Option<String>, TokenStoreError> {
        Ok(self.token.clone())
    }
}

/// Token kept in Redis under `zalo:access_token`, refreshed out of band.
#[cfg(feature = "redis")]
#[derive(Debug, Clone)]
pub struct RedisTokenStore {
    client: Arc<redis::Client>,
    key: String,
}

#[cfg(feature = "redis")]
impl RedisTokenStore {
    pub const DEFAULT_KEY: &'static str = "zalo:access_token";

    pub fn new(redis_url: impl AsRef<str>) -> Result<Self, TokenStoreError> {
        let client = redis::Client::open(redis_url.as_ref())
            .map_err(|e| TokenStoreError::Unavailable(e.to_string()))?;
        Ok(Self {
            client: Arc::new(client),
            key: Self::DEFAULT_KEY.to_string(),
        })
    }
}

#[cfg(feature = "redis")]
#[async_trait]
impl TokenStore for RedisTokenStore {
    async fn access_token(&self) -> Result<Option<String>, TokenStoreError> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| TokenStoreError::Unavailable(e.to_string()))?;
        let token: Option<String> = redis::cmd("GET")
            .arg(&self.key)
            .query_async(&mut conn)
            .await
            .map_err(|e| TokenStoreError::Unavailable(e.to_string()))?;
        Ok(token.filter(|t| !t.trim().is_empty()))
    }
}

#[derive(Debug, Serialize)]
struct Recipient<'a> {
    user_id: &'a str,
}

#[derive(Debug, Serialize)]
struct TextMessage<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    recipient: Recipient<'a>,
    message: TextMessage<'a>,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    #[serde(default)]
    error: i64,
    #[serde(default)]
    message: Option<String>,
}

/// Sends customer-service text messages through the Zalo OA API.
#[derive(Clone)]
pub struct ZaloClient {
    client: reqwest::Client,
    url: String,
    tokens: Arc<dyn TokenStore>,
}

impl ZaloClient {
    pub fn new(url: impl Into<String>, tokens: Arc<dyn TokenStore>, timeout: Duration) -> Self {
        Self {
            client: http_client(timeout),
            url: url.into(),
            tokens,
        }
    }
}

#[async_trait]
impl OutboundChannel for ZaloClient {
    #[instrument(skip(self, text), fields(chars = text.chars().count()))]
    async fn send_text(&self, recipient_id: &str, text: &str) -> bool {
        let token = match self.tokens.access_token().await {
            Ok(Some(token)) => token,
            Ok(None) => {
                warn!("no Zalo access token configured, message dropped");
                return false;
            }
            Err(e) => {
                error!(error = %e, "could not read Zalo access token");
                return false;
            }
        };

        let body = SendRequest {
            recipient: Recipient {
                user_id: recipient_id,
            },
            message: TextMessage { text },
        };

        let resp = match self
            .client
            .post(&self.url)
            .header("access_token", token)
            .json(&body)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                error!(error = %e, "Zalo send request failed");
                return false;
            }
        };

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            error!(status = status.as_u16(), %body, "Zalo rejected message");
            return false;
        }

        match resp.json::<SendResponse>().await {
            Ok(SendResponse { error: 0, .. }) => {
                info!("Zalo message sent");
                true
            }
            Ok(SendResponse { error, message }) => {
                error!(code = error, message = message.as_deref().unwrap_or(""), "Zalo API error");
                false
            }
            Err(e) => {
                error!(error = %e, "unreadable Zalo response");
                false
            }
        }
    }
}
