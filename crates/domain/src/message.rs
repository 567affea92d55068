//! Conversation messages and the agent execution steps they carry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Message
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Where a message is in its lifecycle.
///
/// An assistant placeholder starts `Pending`, becomes `Streaming` once the
/// agent stream is open, and ends in exactly one of the terminal states.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum MessageState {
    #[default]
    Pending,
    Streaming,
    Completed,
    Failed { reason: String },
    Cancelled,
}

impl MessageState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            MessageState::Completed | MessageState::Failed { .. } | MessageState::Cancelled
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            MessageState::Pending => "pending",
            MessageState::Streaming => "streaming",
            MessageState::Completed => "completed",
            MessageState::Failed { .. } => "failed",
            MessageState::Cancelled => "cancelled",
        }
    }
}

/// One conversation message.
///
/// Assistant messages are built incrementally from the agent stream: text
/// arrives as appended tokens (or a wholesale replacement), steps are
/// upserted by id, and artifacts are appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    /// Insertion order is first-seen order; ids are unique.
    #[serde(default)]
    pub steps: Vec<Step>,
    /// Opaque structured records (charts, tables, insights), append-only.
    #[serde(default)]
    pub artifacts: Vec<Value>,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub state: MessageState,
}

impl Message {
    /// A finished user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role: Role::User,
            content: content.into(),
            steps: Vec::new(),
            artifacts: Vec::new(),
            timestamp: Utc::now(),
            state: MessageState::Completed,
        }
    }

    /// The empty assistant message a turn starts from.
    pub fn assistant_placeholder() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role: Role::Assistant,
            content: String::new(),
            steps: Vec::new(),
            artifacts: Vec::new(),
            timestamp: Utc::now(),
            state: MessageState::Pending,
        }
    }

    pub fn step(&self, id: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == id)
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Step
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Display status of an agent step.
///
/// The usual progression is `pending → running → completed | failed`, but
/// transitions are driven entirely by the server and never validated here.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
}

impl StepStatus {
    pub fn is_finished(self) -> bool {
        matches!(self, StepStatus::Completed | StepStatus::Failed)
    }
}

/// A unit of agent execution progress (planning, code generation, execution).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub status: StepStatus,
    /// Detail such as a rationale or generated code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Secondary detail such as an execution result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}
