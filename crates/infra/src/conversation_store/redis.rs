//! Redis-backed conversation backend.
//!
//! ## Layout
//!
//! - **Key**: `zalo:conversation:{user_id}`, one JSON document per user.
//! - **Expiry**: `SET ... EX ttl` on every write, `EXPIRE` on every read.
//! - **Compare-and-swap**: a Lua script reads the stored `version`, compares it
//!   with the writer's expectation and only then overwrites the document, so
//!   the check and the write are atomic on the server.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, instrument, warn};

use glasserp_conversation::{ConversationBackend, ConversationState, StoreError};
use glasserp_core::ExpectedVersion;

/// Default key prefix for conversation documents.
pub const DEFAULT_KEY_PREFIX: &str = "zalo:conversation:";

const SCAN_BATCH: usize = 100;

const SAVE_SCRIPT: &str = r#"
local current = redis.call('GET', KEYS[1])
local version = 0
if current then
  local ok, decoded = pcall(cjson.decode, current)
  if ok and decoded['version'] then
    version = tonumber(decoded['version'])
  end
end
if ARGV[1] ~= 'any' and tonumber(ARGV[1]) ~= version then
  return {0, version}
end
redis.call('SET', KEYS[1], ARGV[2], 'EX', ARGV[3])
return {1, version}
"#;

#[derive(Debug, thiserror::Error)]
pub enum RedisConversationError {
    #[error("Redis connection error: {0}")]
    Connection(String),

    #[error("Redis command error: {0}")]
    Command(String),
}

impl From<RedisConversationError> for StoreError {
    fn from(e: RedisConversationError) -> Self {
        StoreError::Unavailable(e.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct RedisConversationBackend {
    client: Arc<redis::Client>,
    key_prefix: String,
    save_script: Arc<redis::Script>,
}

impl RedisConversationBackend {
    /// Create a backend for `redis_url` (e.g. `redis://localhost:6379`).
    ///
    /// No connection is made until the first command.
    pub fn new(
        redis_url: impl AsRef<str>,
        key_prefix: Option<String>,
    ) -> Result<Self, RedisConversationError> {
        let client = redis::Client::open(redis_url.as_ref())
            .map_err(|e| RedisConversationError::Connection(e.to_string()))?;

        Ok(Self {
            client: Arc::new(client),
            key_prefix: key_prefix.unwrap_or_else(|| DEFAULT_KEY_PREFIX.to_string()),
            save_script: Arc::new(redis::Script::new(SAVE_SCRIPT)),
        })
    }

    pub fn key_for(&self, user_id: &str) -> String {
        format!("{}{}", self.key_prefix, user_id)
    }

    async fn connection(
        &self,
    ) -> Result<redis::aio::MultiplexedConnection, RedisConversationError> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| RedisConversationError::Connection(e.to_string()))
    }

    fn decode(raw: &str) -> Result<ConversationState, StoreError> {
        serde_json::from_str(raw).map_err(|e| StoreError::Serialization(e.to_string()))
    }
}

fn command_error(e: redis::RedisError) -> StoreError {
    RedisConversationError::Command(e.to_string()).into()
}

fn ttl_secs(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

#[async_trait]
impl ConversationBackend for RedisConversationBackend {
    #[instrument(skip(self), err)]
    async fn load(&self, user_id: &str) -> Result<Option<ConversationState>, StoreError> {
        let mut conn = self.connection().await?;
        let raw: Option<String> = redis::cmd("GET")
            .arg(self.key_for(user_id))
            .query_async(&mut conn)
            .await
            .map_err(command_error)?;

        raw.as_deref().map(Self::decode).transpose()
    }

    #[instrument(skip(self, state), fields(user_id = %state.user_id, version = state.version), err)]
    async fn save(
        &self,
        state: &ConversationState,
        expected: ExpectedVersion,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let payload =
            serde_json::to_string(state).map_err(|e| StoreError::Serialization(e.to_string()))?;
        let expected_arg = match expected {
            ExpectedVersion::Any => "any".to_string(),
            ExpectedVersion::Exact(v) => v.to_string(),
        };

        let mut conn = self.connection().await?;
        let (written, actual): (i64, i64) = self
            .save_script
            .key(self.key_for(&state.user_id))
            .arg(expected_arg)
            .arg(payload)
            .arg(ttl_secs(ttl))
            .invoke_async(&mut conn)
            .await
            .map_err(command_error)?;

        if written == 1 {
            Ok(())
        } else {
            debug!(actual, "conversation version mismatch");
            Err(StoreError::Conflict {
                user_id: state.user_id.clone(),
                expected,
                actual: u64::try_from(actual).unwrap_or(0),
            })
        }
    }

    async fn touch(&self, user_id: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut conn = self.connection().await?;
        let _: i64 = redis::cmd("EXPIRE")
            .arg(self.key_for(user_id))
            .arg(ttl_secs(ttl))
            .query_async(&mut conn)
            .await
            .map_err(command_error)?;
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn remove(&self, user_id: &str) -> Result<bool, StoreError> {
        let mut conn = self.connection().await?;
        let removed: i64 = redis::cmd("DEL")
            .arg(self.key_for(user_id))
            .query_async(&mut conn)
            .await
            .map_err(command_error)?;
        Ok(removed > 0)
    }

    async fn list(&self) -> Result<Vec<ConversationState>, StoreError> {
        let mut conn = self.connection().await?;
        let pattern = format!("{}*", self.key_prefix);

        let mut keys = Vec::new();
        let mut cursor: u64 = 0;
        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await
                .map_err(command_error)?;
            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }

        let mut states = Vec::with_capacity(keys.len());
        for key in keys {
            let raw: Option<String> = redis::cmd("GET")
                .arg(&key)
                .query_async(&mut conn)
                .await
                .map_err(command_error)?;
            // keys may expire between SCAN and GET
            let Some(raw) = raw else { continue };
            match Self::decode(&raw) {
                Ok(state) => states.push(state),
                Err(e) => warn!(%key, error = %e, "skipping undecodable conversation"),
            }
        }
        states.sort_by(|a, b| b.last_activity.cmp(&a.last_activity));
        Ok(states)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.connection().await?;
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(command_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_use_the_conversation_prefix() {
        let backend = RedisConversationBackend::new("redis://127.0.0.1:6379", None).unwrap();
        assert_eq!(backend.key_for("12345"), "zalo:conversation:12345");

        let custom =
            RedisConversationBackend::new("redis://127.0.0.1:6379", Some("test:conv:".into())).unwrap();
        assert_eq!(custom.key_for("u"), "test:conv:u");
    }

    #[test]
    fn invalid_url_is_a_connection_error() {
        let err = RedisConversationBackend::new("not a url", None).unwrap_err();
        assert!(matches!(err, RedisConversationError::Connection(_)));
    }

    #[test]
    fn ttl_is_never_rounded_down_to_zero() {
        assert_eq!(ttl_secs(Duration::from_millis(10)), 1);
        assert_eq!(ttl_secs(Duration::from_secs(86_400)), 86_400);
    }

    #[tokio::test]
    async fn unreachable_server_surfaces_as_unavailable() {
        let backend = RedisConversationBackend::new("redis://127.0.0.1:1", None).unwrap();
        assert!(matches!(backend.ping().await, Err(StoreError::Unavailable(_))));
    }
}
