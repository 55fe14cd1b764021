//! Session-to-conversation mapping.
//!
//! One in-flight turn per session is assumed. Concurrent turns on the same
//! session race and the last write wins. A conversation id lives no longer
//! than the cookie session it belongs to.

use crate::models::{ConversationState, SessionId};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::task::JoinHandle;

#[derive(Debug, Error)]
pub enum SessionStoreError {
    #[error("Session backend unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get_conversation_id(
        &self,
        session_id: &SessionId,
    ) -> Result<Option<String>, SessionStoreError>;

    /// Overwrites any previous conversation id for the session.
    async fn set_conversation_id(
        &self,
        session_id: &SessionId,
        conversation_id: String,
    ) -> Result<(), SessionStoreError>;

    async fn state(&self, session_id: &SessionId) -> Result<ConversationState, SessionStoreError> {
        Ok(ConversationState {
            session_id: session_id.clone(),
            conversation_id: self.get_conversation_id(session_id).await?,
        })
    }
}

/// Inactivity window used when no expiry is configured.
const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone)]
struct Entry {
    conversation_id: String,
    touched: Instant,
}

/// Process-local store.
///
/// Entries expire after `ttl` without a read or write, matching the inactivity
/// expiry of the cookie session that owns the `SessionId`. Expired entries are
/// dropped on access and by [`InMemorySessionStore::purge_expired`].
#[derive(Debug)]
pub struct InMemorySessionStore {
    conversations: DashMap<SessionId, Entry>,
    ttl: Duration,
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            conversations: DashMap::new(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    /// Drop every entry idle for longer than the ttl. Returns how many went.
    pub fn purge_expired(&self) -> usize {
        let before = self.conversations.len();
        let ttl = self.ttl;
        self.conversations
            .retain(|_, entry| entry.touched.elapsed() <= ttl);
        before.saturating_sub(self.conversations.len())
    }

    /// Purge expired entries every `every` until the store is dropped.
    pub fn spawn_sweeper(store: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let store = Arc::downgrade(store);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(store) = store.upgrade() else {
                    break;
                };
                let purged = store.purge_expired();
                if purged > 0 {
                    tracing::debug!(purged, remaining = store.len(), "Purged idle conversations");
                }
            }
        })
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get_conversation_id(
        &self,
        session_id: &SessionId,
    ) -> Result<Option<String>, SessionStoreError> {
        let ttl = self.ttl;
        let expired = match self.conversations.get_mut(session_id) {
            Some(mut entry) if entry.touched.elapsed() <= ttl => {
                entry.touched = Instant::now();
                return Ok(Some(entry.conversation_id.clone()));
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            self.conversations
                .remove_if(session_id, |_, entry| entry.touched.elapsed() > ttl);
        }
        Ok(None)
    }

    async fn set_conversation_id(
        &self,
        session_id: &SessionId,
        conversation_id: String,
    ) -> Result<(), SessionStoreError> {
        self.conversations.insert(
            session_id.clone(),
            Entry {
                conversation_id,
                touched: Instant::now(),
            },
        );
        Ok(())
    }
}
