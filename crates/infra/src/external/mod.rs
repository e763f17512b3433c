pub mod order_parser;
pub mod zalo;

pub use order_parser::HttpOrderParser;
pub use zalo::{
    DEFAULT_ZALO_SEND_URL, StaticTokenStore, TokenStore, TokenStoreError, ZaloClient,
};

#[cfg(feature = "redis")]
pub use zalo::RedisTokenStore;

use std::time::Duration;

/// Default timeout for outbound HTTP calls.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

pub(crate) fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "falling back to default http client");
            reqwest::Client::new()
        })
}
