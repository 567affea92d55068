//! One turn in flight per conversation.
//!
//! Each conversation maps to a `Semaphore(1)` plus a claim counter.  The
//! turn task holds the permit until its outcome is final.  Callers that
//! pre-empt the running turn [`claim`](TurnGate::claim) the conversation
//! first; only the newest claim keeps the permit once it is handed over.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

struct Slot {
    semaphore: Arc<Semaphore>,
    generation: AtomicU64,
}

#[derive(Default)]
pub struct TurnGate {
    slots: Mutex<HashMap<String, Arc<Slot>>>,
}

impl TurnGate {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, conversation: &str) -> Arc<Slot> {
        self.slots
            .lock()
            .entry(conversation.to_owned())
            .or_insert_with(|| {
                Arc::new(Slot {
                    semaphore: Arc::new(Semaphore::new(1)),
                    generation: AtomicU64::new(0),
                })
            })
            .clone()
    }

    /// Take the permit if no turn is running, otherwise fail immediately.
    pub fn try_acquire(&self, conversation: &str) -> Result<TurnPermit, TurnBusy> {
        let slot = self.slot(conversation);
        let permit = Arc::clone(&slot.semaphore)
            .try_acquire_owned()
            .map_err(|_| TurnBusy)?;
        let generation = slot.generation.load(Ordering::SeqCst);
        Ok(TurnPermit {
            _permit: permit,
            slot,
            generation,
        })
    }

    /// Become the newest caller on a conversation.  Every earlier claim
    /// still waiting for the permit is superseded.
    pub fn claim(&self, conversation: &str) -> Claim {
        let slot = self.slot(conversation);
        let generation = slot.generation.fetch_add(1, Ordering::SeqCst) + 1;
        Claim { slot, generation }
    }

    /// Number of tracked conversations.
    pub fn conversation_count(&self) -> usize {
        self.slots.lock().len()
    }

    /// Forget a conversation nobody holds or waits on.
    pub fn prune(&self, conversation: &str) {
        let mut slots = self.slots.lock();
        if slots
            .get(conversation)
            .is_some_and(|slot| Arc::strong_count(slot) == 1)
        {
            slots.remove(conversation);
        }
    }
}

/// A pending claim from [`TurnGate::claim`].
pub struct Claim {
    slot: Arc<Slot>,
    generation: u64,
}

impl Claim {
    /// Wait for the running turn (if any) to release the permit.  Fails if
    /// a newer claim arrived in the meantime.
    pub async fn acquire(self) -> Result<TurnPermit, TurnBusy> {
        let permit = Arc::clone(&self.slot.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| TurnBusy)?;
        let permit = TurnPermit {
            _permit: permit,
            slot: self.slot,
            generation: self.generation,
        };
        if permit.is_superseded() {
            return Err(TurnBusy);
        }
        Ok(permit)
    }
}

/// Exclusive right to run a turn on one conversation.  Released on drop.
pub struct TurnPermit {
    _permit: OwnedSemaphorePermit,
    slot: Arc<Slot>,
    generation: u64,
}

impl TurnPermit {
    /// Whether a newer caller claimed the conversation after this permit
    /// was issued.
    pub fn is_superseded(&self) -> bool {
        self.slot.generation.load(Ordering::SeqCst) != self.generation
    }
}

/// A turn is already running on the conversation.
#[derive(Debug)]
pub struct TurnBusy;

impl std::fmt::Display for TurnBusy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "a turn is already in flight")
    }
}

impl std::error::Error for TurnBusy {}
