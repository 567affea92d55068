//! Per-conversation cancellation tokens.
//!
//! Each running turn gets a `CancelToken`.  Calling `cancel()` on it stops
//! the turn at its next suspension point (upload or chunk read).

use std::collections::HashMap;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

/// A cancellation token the turn task can both poll and await.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    inner: CancellationToken,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal cancellation.
    pub fn cancel(&self) {
        self.inner.cancel();
    }

    /// Check if cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.inner.is_cancelled()
    }

    /// Resolves once cancellation has been requested.
    pub async fn cancelled(&self) {
        self.inner.cancelled().await
    }
}

/// Tracks the token of the running turn for each conversation.
///
/// Entries are tagged with the turn id so a turn that finishes late never
/// removes the token of the turn that replaced it.
#[derive(Default)]
pub struct CancelMap {
    tokens: Mutex<HashMap<String, (uuid::Uuid, CancelToken)>>,
}

impl CancelMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create and register a new cancel token for a conversation's turn.
    pub fn register(&self, conversation: &str, turn_id: uuid::Uuid) -> CancelToken {
        let token = CancelToken::new();
        self.tokens
            .lock()
            .insert(conversation.to_owned(), (turn_id, token.clone()));
        token
    }

    /// Cancel the running turn of a conversation.  Returns true if one was
    /// found.
    pub fn cancel(&self, conversation: &str) -> bool {
        match self.tokens.lock().get(conversation) {
            Some((_, token)) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Remove the token registered by `turn_id` (called when that turn
    /// ends).
    pub fn remove(&self, conversation: &str, turn_id: uuid::Uuid) {
        let mut tokens = self.tokens.lock();
        if tokens.get(conversation).is_some_and(|(id, _)| *id == turn_id) {
            tokens.remove(conversation);
        }
    }

    #[cfg(test)]
    fn is_running(&self, conversation: &str) -> bool {
        self.tokens.lock().contains_key(conversation)
    }

    /// Number of turns currently registered.
    pub fn running_count(&self) -> usize {
        self.tokens.lock().len()
    }
}
