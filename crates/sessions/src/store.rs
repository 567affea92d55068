//! In-memory conversation sessions.
//!
//! A session lives as long as the process and carries the two things that
//! outlive a single turn: the uploaded dataset handle and the message
//! history.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use ot_domain::{DatasetHandle, Message};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Conversation session
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct ConversationSession {
    id: String,
    created_at: DateTime<Utc>,
    /// Async lock: held across the upload so only one caller performs it.
    pub(crate) dataset: tokio::sync::Mutex<Option<DatasetHandle>>,
    history: RwLock<Vec<Message>>,
}

impl ConversationSession {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            created_at: Utc::now(),
            dataset: tokio::sync::Mutex::new(None),
            history: RwLock::new(Vec::new()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Current dataset handle.  Waits if an upload is in progress.
    pub async fn dataset_handle(&self) -> Option<DatasetHandle> {
        self.dataset.lock().await.clone()
    }

    pub fn push_history(&self, message: Message) {
        self.history.write().push(message);
    }

    pub fn history(&self) -> Vec<Message> {
        self.history.read().clone()
    }

    pub fn history_len(&self) -> usize {
        self.history.read().len()
    }
}

impl std::fmt::Debug for ConversationSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationSession")
            .field("id", &self.id)
            .field("created_at", &self.created_at)
            .field("messages", &self.history_len())
            .finish()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Session store
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Arc<ConversationSession>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a session by id, creating it if needed.  `None` starts a
    /// new conversation with a generated id.
    pub fn resolve_or_create(&self, id: Option<&str>) -> Arc<ConversationSession> {
        let id = match id {
            Some(id) => id.to_string(),
            None => uuid::Uuid::new_v4().to_string(),
        };

        if let Some(existing) = self.sessions.read().get(&id) {
            return Arc::clone(existing);
        }

        let mut sessions = self.sessions.write();
        Arc::clone(sessions.entry(id).or_insert_with_key(|id| {
            tracing::debug!(conversation = %id, "new conversation session");
            Arc::new(ConversationSession::new(id.clone()))
        }))
    }

    pub fn get(&self, id: &str) -> Option<Arc<ConversationSession>> {
        self.sessions.read().get(id).cloned()
    }

    /// Forget a session (its dataset handle and history).  Returns whether
    /// it existed.
    pub fn reset(&self, id: &str) -> bool {
        self.sessions.write().remove(id).is_some()
    }

    pub fn ids(&self) -> Vec<String> {
        self.sessions.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}
