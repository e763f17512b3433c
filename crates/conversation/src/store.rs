//! Conversation store.
//!
//! The store is the only source of truth for a conversation. Every mutation is
//! a read-modify-write guarded by the record version: a writer that lost the
//! race re-reads and re-applies its mutation, up to
//! [`StoreSettings::max_write_attempts`] times.
//!
//! Expiry is sliding: any successful read or write of a live record pushes its
//! expiry `ttl` into the future.
//!
//! When the backend is down the store degrades instead of failing:
//! `get_or_create` hands out a fresh, unpersisted conversation and mutations
//! report `false`.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use glasserp_core::{ExpectedVersion, Versioned};

use crate::state::{ConversationState, DialogState};

/// Default lifetime of an idle conversation.
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Default number of history entries kept per conversation.
pub const DEFAULT_HISTORY_LIMIT: usize = 200;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("conversation backend unavailable: {0}")]
    Unavailable(String),

    #[error("version conflict for {user_id}: expected {expected:?}, found {actual}")]
    Conflict {
        user_id: String,
        expected: ExpectedVersion,
        actual: u64,
    },

    #[error("conversation serialization error: {0}")]
    Serialization(String),
}

/// Key-value persistence of conversations.
///
/// `save` must be atomic with respect to the version check: it succeeds only if
/// the stored record (absent = version 0) matches `expected`, and then stores
/// `state` as given, including `state.version`.
#[async_trait]
pub trait ConversationBackend: Send + Sync {
    async fn load(&self, user_id: &str) -> Result<Option<ConversationState>, StoreError>;

    async fn save(
        &self,
        state: &ConversationState,
        expected: ExpectedVersion,
        ttl: Duration,
    ) -> Result<(), StoreError>;

    /// Refresh the expiry of a live record. Missing records are ignored.
    async fn touch(&self, user_id: &str, ttl: Duration) -> Result<(), StoreError>;

    async fn remove(&self, user_id: &str) -> Result<bool, StoreError>;

    /// All live conversations.
    async fn list(&self) -> Result<Vec<ConversationState>, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}

#[async_trait]
impl<S> ConversationBackend for Arc<S>
where
    S: ConversationBackend + ?Sized,
{
    async fn load(&self, user_id: &str) -> Result<Option<ConversationState>, StoreError> {
        (**self).load(user_id).await
    }

    async fn save(
        &self,
        state: &ConversationState,
        expected: ExpectedVersion,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        (**self).save(state, expected, ttl).await
    }

    async fn touch(&self, user_id: &str, ttl: Duration) -> Result<(), StoreError> {
        (**self).touch(user_id, ttl).await
    }

    async fn remove(&self, user_id: &str) -> Result<bool, StoreError> {
        (**self).remove(user_id).await
    }

    async fn list(&self) -> Result<Vec<ConversationState>, StoreError> {
        (**self).list().await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        (**self).ping().await
    }
}

#[derive(Debug, Clone)]
struct Entry {
    state: ConversationState,
    expires_at: Instant,
}

/// In-memory backend for tests/dev. Expiry follows `tokio::time`, so paused
/// test clocks apply.
#[derive(Debug, Default)]
pub struct InMemoryConversationBackend {
    inner: RwLock<HashMap<String, Entry>>,
}

impl InMemoryConversationBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned() -> StoreError {
        StoreError::Unavailable("lock poisoned".into())
    }
}

#[async_trait]
impl ConversationBackend for InMemoryConversationBackend {
    async fn load(&self, user_id: &str) -> Result<Option<ConversationState>, StoreError> {
        let map = self.inner.read().map_err(|_| Self::poisoned())?;
        Ok(map
            .get(user_id)
            .filter(|e| e.expires_at > Instant::now())
            .map(|e| e.state.clone()))
    }

    async fn save(
        &self,
        state: &ConversationState,
        expected: ExpectedVersion,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let mut map = self.inner.write().map_err(|_| Self::poisoned())?;
        let now = Instant::now();
        let actual = map
            .get(&state.user_id)
            .filter(|e| e.expires_at > now)
            .map(|e| e.state.version())
            .unwrap_or(0);

        if !expected.matches(actual) {
            return Err(StoreError::Conflict {
                user_id: state.user_id.clone(),
                expected,
                actual,
            });
        }

        map.insert(
            state.user_id.clone(),
            Entry {
                state: state.clone(),
                expires_at: now + ttl,
            },
        );
        Ok(())
    }

    async fn touch(&self, user_id: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut map = self.inner.write().map_err(|_| Self::poisoned())?;
        let now = Instant::now();
        if let Some(entry) = map.get_mut(user_id) {
            if entry.expires_at > now {
                entry.expires_at = now + ttl;
            }
        }
        Ok(())
    }

    async fn remove(&self, user_id: &str) -> Result<bool, StoreError> {
        let mut map = self.inner.write().map_err(|_| Self::poisoned())?;
        let now = Instant::now();
        Ok(map
            .remove(user_id)
            .is_some_and(|e| e.expires_at > now))
    }

    async fn list(&self) -> Result<Vec<ConversationState>, StoreError> {
        let mut map = self.inner.write().map_err(|_| Self::poisoned())?;
        let now = Instant::now();
        map.retain(|_, e| e.expires_at > now);
        let mut states: Vec<ConversationState> = map.values().map(|e| e.state.clone()).collect();
        states.sort_by(|a, b| b.last_activity.cmp(&a.last_activity));
        Ok(states)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.inner.read().map(|_| ()).map_err(|_| Self::poisoned())
    }
}

#[derive(Debug, Clone)]
pub struct StoreSettings {
    pub ttl: Duration,
    pub history_limit: usize,
    pub max_write_attempts: u32,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            history_limit: DEFAULT_HISTORY_LIMIT,
            max_write_attempts: 3,
        }
    }
}

#[derive(Clone)]
pub struct ConversationStore {
    backend: Arc<dyn ConversationBackend>,
    settings: StoreSettings,
}

impl ConversationStore {
    pub fn new(backend: Arc<dyn ConversationBackend>, settings: StoreSettings) -> Self {
        Self { backend, settings }
    }

    pub fn settings(&self) -> &StoreSettings {
        &self.settings
    }

    /// Existing live conversation, or a newly persisted one in `NEW`.
    #[instrument(skip(self))]
    pub async fn get_or_create(&self, user_id: &str) -> ConversationState {
        for _ in 0..self.settings.max_write_attempts {
            match self.backend.load(user_id).await {
                Ok(Some(existing)) => {
                    self.refresh_expiry(user_id).await;
                    return existing;
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(error = %e, "conversation store unavailable, using transient conversation");
                    return ConversationState::new(user_id, Utc::now());
                }
            }

            let mut fresh = ConversationState::new(user_id, Utc::now());
            fresh.version = ExpectedVersion::Exact(0).next_version(0);
            match self
                .backend
                .save(&fresh, ExpectedVersion::Exact(0), self.settings.ttl)
                .await
            {
                Ok(()) => {
                    debug!("created conversation");
                    return fresh;
                }
                Err(StoreError::Conflict { .. }) => continue,
                Err(e) => {
                    warn!(error = %e, "failed to persist new conversation");
                    fresh.version = 0;
                    return fresh;
                }
            }
        }

        warn!("could not settle conversation creation, using transient conversation");
        ConversationState::new(user_id, Utc::now())
    }

    #[instrument(skip(self))]
    pub async fn get(&self, user_id: &str) -> Option<ConversationState> {
        match self.backend.load(user_id).await {
            Ok(Some(state)) => {
                self.refresh_expiry(user_id).await;
                Some(state)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "failed to load conversation");
                None
            }
        }
    }

    pub async fn update_state(&self, user_id: &str, new_state: DialogState) -> bool {
        self.update_fields(user_id, |c| c.current_state = new_state).await
    }

    pub async fn update_fields<F>(&self, user_id: &str, mutate: F) -> bool
    where
        F: Fn(&mut ConversationState) + Send + Sync,
    {
        self.modify(user_id, mutate).await.is_some()
    }

    /// Apply `mutate` to the stored conversation and return the persisted
    /// result. `None` if the conversation does not exist, the backend failed,
    /// or the write kept losing races.
    #[instrument(skip(self, mutate))]
    pub async fn modify<F>(&self, user_id: &str, mutate: F) -> Option<ConversationState>
    where
        F: Fn(&mut ConversationState) + Send + Sync,
    {
        for attempt in 1..=self.settings.max_write_attempts {
            let current = match self.backend.load(user_id).await {
                Ok(Some(c)) => c,
                Ok(None) => return None,
                Err(e) => {
                    warn!(error = %e, "failed to load conversation for update");
                    return None;
                }
            };

            let expected = ExpectedVersion::Exact(current.version());
            let mut next = current;
            mutate(&mut next);
            next.truncate_history(self.settings.history_limit);
            next.last_activity = Utc::now();
            next.version = expected.next_version(next.version);

            match self.backend.save(&next, expected, self.settings.ttl).await {
                Ok(()) => return Some(next),
                Err(StoreError::Conflict { actual, .. }) => {
                    debug!(attempt, actual, "conversation write lost a race, retrying");
                }
                Err(e) => {
                    warn!(error = %e, "failed to save conversation");
                    return None;
                }
            }
        }

        warn!("giving up on conversation update after repeated conflicts");
        None
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, user_id: &str) -> bool {
        match self.backend.remove(user_id).await {
            Ok(removed) => removed,
            Err(e) => {
                warn!(error = %e, "failed to delete conversation");
                false
            }
        }
    }

    /// Live conversations, optionally restricted to one dialog state.
    pub async fn list(&self, state: Option<DialogState>) -> Result<Vec<ConversationState>, StoreError> {
        let all = self.backend.list().await?;
        Ok(match state {
            Some(s) => all.into_iter().filter(|c| c.current_state == s).collect(),
            None => all,
        })
    }

    pub async fn ping(&self) -> Result<(), StoreError> {
        self.backend.ping().await
    }

    async fn refresh_expiry(&self, user_id: &str) {
        if let Err(e) = self.backend.touch(user_id, self.settings.ttl).await {
            debug!(error = %e, "failed to refresh conversation expiry");
        }
    }
}
