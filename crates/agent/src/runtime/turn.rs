//! Turn execution loop: upload the dataset if needed, open the agent
//! stream, fold frames into the assistant message, publish snapshots.
//!
//! Entry point: [`run_turn`] spawns the turn task and returns a
//! [`TurnHandle`] whose channel carries [`TurnUpdate`]s.

use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::Instrument;

use ot_client::{ChunkSource, TurnRequest};
use ot_domain::config::OverlapPolicy;
use ot_domain::error::{Error, Result};
use ot_domain::stream::BoxStream;
use ot_domain::trace::TraceEvent;
use ot_domain::{Dataset, Message, MessageState};
use ot_protocol::MessageFold;
use ot_sessions::{AssetOutcome, ConversationSession};

use crate::state::AgentState;

use super::cancel::CancelToken;
use super::gate::TurnPermit;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// TurnUpdate: what the consumer sees
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Warn,
}

/// How a turn ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TurnOutcome {
    /// The stream ended cleanly.  `saw_done` is false when the server
    /// closed the stream without sending `done`.
    Completed { saw_done: bool },
    Failed { error: String },
    Cancelled,
}

impl TurnOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            TurnOutcome::Completed { .. } => "completed",
            TurnOutcome::Failed { .. } => "failed",
            TurnOutcome::Cancelled => "cancelled",
        }
    }
}

/// Updates emitted during a single turn.
///
/// Every turn yields a pending placeholder snapshot first and exactly one
/// `Finished` last.
#[derive(Debug, Clone)]
pub enum TurnUpdate {
    /// The assistant message as it stands now.  Earlier snapshots are
    /// never modified.
    Snapshot(Arc<Message>),
    /// Transient, non-fatal information (e.g. a failed upload).
    Notice { level: NoticeLevel, text: String },
    Finished {
        message: Arc<Message>,
        outcome: TurnOutcome,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Run parameters
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Input to a single turn.
#[derive(Debug, Clone, Default)]
pub struct TurnInput {
    /// `None` starts a new conversation.
    pub conversation_id: Option<String>,
    pub message: String,
    /// Only uploaded if the conversation has no dataset handle yet.
    pub dataset: Option<Dataset>,
}

impl TurnInput {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn conversation(mut self, id: impl Into<String>) -> Self {
        self.conversation_id = Some(id.into());
        self
    }

    pub fn dataset(mut self, dataset: Dataset) -> Self {
        self.dataset = Some(dataset);
        self
    }
}

/// The consumer's end of a running turn.
pub struct TurnHandle {
    turn_id: uuid::Uuid,
    conversation_id: String,
    rx: mpsc::Receiver<TurnUpdate>,
    cancel: CancelToken,
}

impl TurnHandle {
    pub fn turn_id(&self) -> uuid::Uuid {
        self.turn_id
    }

    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    /// Stop the turn.  It still ends with a `Finished` update.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub async fn recv(&mut self) -> Option<TurnUpdate> {
        self.rx.recv().await
    }

    pub fn into_stream(self) -> BoxStream<'static, TurnUpdate> {
        let mut rx = self.rx;
        Box::pin(async_stream::stream! {
            while let Some(update) = rx.recv().await {
                yield update;
            }
        })
    }

    /// Drain the turn and return its terminal message and outcome.
    pub async fn finished(mut self) -> Result<(Arc<Message>, TurnOutcome)> {
        while let Some(update) = self.rx.recv().await {
            if let TurnUpdate::Finished { message, outcome } = update {
                return Ok((message, outcome));
            }
        }
        Err(Error::Other(format!(
            "turn {} ended without a final update",
            self.turn_id
        )))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// run_turn
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Start one turn on a conversation.
///
/// Fails with [`Error::ConversationBusy`] when the conversation already has
/// a turn in flight and the overlap policy is `reject`.  With
/// `cancel_previous` the running turn is cancelled and this call waits for
/// it to wind down; if yet another turn starts on the conversation in the
/// meantime, the newest one wins and this call fails with
/// `ConversationBusy`.  Every other failure is reported through the handle.
pub async fn run_turn(state: &AgentState, input: TurnInput) -> Result<TurnHandle> {
    let session = state
        .sessions
        .resolve_or_create(input.conversation_id.as_deref());
    let conversation = session.id().to_string();

    let permit = match state.config.stream.overlap {
        OverlapPolicy::Reject => state.gate.try_acquire(&conversation),
        OverlapPolicy::CancelPrevious => {
            let claim = state.gate.claim(&conversation);
            if state.cancel_map.cancel(&conversation) {
                tracing::debug!(%conversation, "cancelling previous turn");
            }
            claim.acquire().await
        }
    }
    .map_err(|_| Error::ConversationBusy(conversation.clone()))?;

    let turn_id = uuid::Uuid::new_v4();
    let cancel = state.cancel_map.register(&conversation, turn_id);
    // A newer claim may have run its cancel before this token was registered.
    if permit.is_superseded() {
        state.cancel_map.remove(&conversation, turn_id);
        drop(permit);
        state.gate.prune(&conversation);
        return Err(Error::ConversationBusy(conversation));
    }
    let (tx, rx) = mpsc::channel(state.config.stream.channel_capacity.max(1));

    let span = tracing::info_span!("turn", %turn_id, %conversation);
    let task_state = state.clone();
    let task_cancel = cancel.clone();
    tokio::spawn(
        async move {
            tracing::debug!("turn started");
            drive_turn(&task_state, &session, input, tx, task_cancel, permit, turn_id).await;
            task_state.cancel_map.remove(session.id(), turn_id);
            task_state.gate.prune(session.id());
            tracing::debug!(
                running_turns = task_state.cancel_map.running_count(),
                tracked_conversations = task_state.gate.conversation_count(),
                "turn released"
            );
        }
        .instrument(span),
    );

    Ok(TurnHandle {
        turn_id,
        conversation_id: conversation,
        rx,
        cancel,
    })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Turn task
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The turn task's exclusive state: the message being built, the sending
/// end of the update channel, and the conversation's gate permit.
struct TurnRun {
    turn_id: uuid::Uuid,
    fold: MessageFold,
    tx: mpsc::Sender<TurnUpdate>,
    cancel: CancelToken,
    permit: Option<TurnPermit>,
    malformed_seen: usize,
    dropped_seen: usize,
}

impl TurnRun {
    /// Send an update while the turn is live.  A consumer that stops
    /// reading does not hold off cancellation: returns false if the turn
    /// was cancelled while the channel was full.
    async fn publish(&self, update: TurnUpdate) -> bool {
        tokio::select! {
            biased;
            sent = self.tx.send(update) => {
                if sent.is_err() {
                    tracing::trace!("turn consumer dropped");
                }
                true
            }
            _ = self.cancel.cancelled() => false,
        }
    }

    async fn publish_snapshots(&mut self, snapshots: Vec<Arc<Message>>) -> bool {
        self.report_drops();
        for snapshot in snapshots {
            if !self.publish(TurnUpdate::Snapshot(snapshot)).await {
                return false;
            }
        }
        true
    }

    fn report_drops(&mut self) {
        let malformed = self.fold.stats().malformed;
        if malformed > self.malformed_seen {
            TraceEvent::FrameDropped {
                turn_id: self.turn_id.to_string(),
                reason: format!("{} malformed", malformed - self.malformed_seen),
            }
            .emit();
            self.malformed_seen = malformed;
        }
        let dropped = self.fold.dropped_frames();
        if dropped > self.dropped_seen {
            TraceEvent::FrameDropped {
                turn_id: self.turn_id.to_string(),
                reason: format!("{} without prefix", dropped - self.dropped_seen),
            }
            .emit();
            self.dropped_seen = dropped;
        }
    }
}

async fn drive_turn(
    state: &AgentState,
    session: &ConversationSession,
    input: TurnInput,
    tx: mpsc::Sender<TurnUpdate>,
    cancel: CancelToken,
    permit: TurnPermit,
    turn_id: uuid::Uuid,
) {
    let started = Instant::now();
    session.push_history(Message::user(input.message.clone()));
    TraceEvent::TurnStarted {
        conversation: session.id().to_string(),
        turn_id: turn_id.to_string(),
        has_dataset: input.dataset.as_ref().is_some_and(|d| !d.is_empty()),
    }
    .emit();

    let mut turn = TurnRun {
        turn_id,
        fold: MessageFold::new(
            Message::assistant_placeholder(),
            &state.config.stream.frame_prefix,
        ),
        tx,
        cancel,
        permit: Some(permit),
        malformed_seen: 0,
        dropped_seen: 0,
    };

    let outcome = stream_turn(state, session, &input, &mut turn).await;
    finalize_turn(state, session, turn, outcome, started).await;
}

/// Everything between the placeholder and the terminal state.  Returns as
/// soon as the outcome is known; the chunk source is dropped on return.
async fn stream_turn(
    state: &AgentState,
    session: &ConversationSession,
    input: &TurnInput,
    turn: &mut TurnRun,
) -> TurnOutcome {
    let cancel = turn.cancel.clone();
    if !turn
        .publish(TurnUpdate::Snapshot(Arc::clone(turn.fold.message())))
        .await
    {
        return TurnOutcome::Cancelled;
    }

    // ── Dataset ──────────────────────────────────────────────────
    let asset = tokio::select! {
        biased;
        _ = cancel.cancelled() => return TurnOutcome::Cancelled,
        outcome = state.assets.ensure_asset(session, input.dataset.as_ref()) => outcome,
    };
    if let AssetOutcome::Failed(e) = &asset {
        let notice = TurnUpdate::Notice {
            level: NoticeLevel::Warn,
            text: format!("Dataset upload failed, continuing without it ({e})"),
        };
        if !turn.publish(notice).await {
            return TurnOutcome::Cancelled;
        }
    }

    let request = TurnRequest {
        message: input.message.clone(),
        dataset_path: asset.handle().map(|h| h.path.clone()),
    };

    // ── Open ─────────────────────────────────────────────────────
    let opened = tokio::select! {
        biased;
        _ = cancel.cancelled() => return TurnOutcome::Cancelled,
        opened = state.transport.open(&request) => opened,
    };
    let mut source = match opened {
        Ok(source) => source,
        Err(e) => {
            tracing::warn!(error = %e, "agent stream could not be opened");
            return TurnOutcome::Failed {
                error: e.to_string(),
            };
        }
    };
    let snapshot = turn.fold.update(|m| m.state = MessageState::Streaming);
    if !turn.publish(TurnUpdate::Snapshot(snapshot)).await {
        return TurnOutcome::Cancelled;
    }

    // ── Read loop ────────────────────────────────────────────────
    let idle = state
        .config
        .stream
        .idle_timeout_ms
        .map(Duration::from_millis);
    loop {
        let chunk = tokio::select! {
            biased;
            _ = cancel.cancelled() => return TurnOutcome::Cancelled,
            chunk = next_chunk(source.as_mut(), idle) => chunk,
        };

        match chunk {
            Ok(Some(bytes)) => {
                let snapshots = turn.fold.feed(&bytes);
                if !turn.publish_snapshots(snapshots).await {
                    return TurnOutcome::Cancelled;
                }
                if turn.fold.is_done() {
                    return TurnOutcome::Completed { saw_done: true };
                }
            }
            Ok(None) => {
                let snapshots = turn.fold.finish();
                if !turn.publish_snapshots(snapshots).await {
                    return TurnOutcome::Cancelled;
                }
                return TurnOutcome::Completed {
                    saw_done: turn.fold.is_done(),
                };
            }
            Err(e) => {
                tracing::warn!(error = %e, "agent stream broke mid-turn");
                return TurnOutcome::Failed {
                    error: e.to_string(),
                };
            }
        }
    }
}

async fn next_chunk(
    source: &mut dyn ChunkSource,
    idle: Option<Duration>,
) -> Result<Option<Bytes>> {
    match idle {
        None => source.next_chunk().await,
        Some(limit) => tokio::time::timeout(limit, source.next_chunk())
            .await
            .map_err(|_| {
                Error::Timeout(format!("no data from agent for {} ms", limit.as_millis()))
            })?,
    }
}

/// Stamp the terminal state, record history, and send `Finished`.
///
/// The gate permit is released before `Finished` is sent, so a stalled
/// consumer never blocks the next turn on the conversation.
async fn finalize_turn(
    state: &AgentState,
    session: &ConversationSession,
    mut turn: TurnRun,
    outcome: TurnOutcome,
    started: Instant,
) {
    let notice = &state.config.stream.failure_notice;
    let message = turn.fold.update(|m| {
        m.state = match &outcome {
            TurnOutcome::Completed { .. } => MessageState::Completed,
            TurnOutcome::Failed { error } => {
                append_notice(&mut m.content, notice);
                MessageState::Failed {
                    reason: error.clone(),
                }
            }
            TurnOutcome::Cancelled => MessageState::Cancelled,
        };
    });
    session.push_history((*message).clone());

    let stats = turn.fold.stats();
    let duration_ms = started.elapsed().as_millis() as u64;
    TraceEvent::TurnFinished {
        conversation: session.id().to_string(),
        turn_id: turn.turn_id.to_string(),
        outcome: outcome.label().to_string(),
        steps: message.steps.len(),
        artifacts: message.artifacts.len(),
        content_chars: message.content.chars().count(),
        malformed_frames: stats.malformed,
        duration_ms,
    }
    .emit();
    tracing::info!(
        outcome = outcome.label(),
        events = stats.events,
        ignored = stats.ignored,
        duration_ms,
        "turn finished"
    );

    drop(turn.permit.take());
    if turn
        .tx
        .send(TurnUpdate::Finished { message, outcome })
        .await
        .is_err()
    {
        tracing::trace!("turn consumer dropped");
    }
}

/// The notice replaces empty content and is appended after partial
/// content, separated by a blank line.
fn append_notice(content: &mut String, notice: &str) {
    if notice.is_empty() {
        return;
    }
    if !content.is_empty() {
        content.push_str("\n\n");
    }
    content.push_str(notice);
}
