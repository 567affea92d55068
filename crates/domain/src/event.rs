use serde_json::Value;

use crate::message::StepStatus;

/// One incremental update decoded from the agent stream.
///
/// The wire format is a JSON object discriminated by `type`; parsing lives
/// in `ot-protocol`, folding into a [`Message`](crate::Message) in its
/// reducer.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    /// `type: "token"`: text appended to the message body.
    Token { content: String },

    /// `type: "step"`: create or partially update a step.
    Step(StepPatch),

    /// `type: "artifact"`: one opaque record appended to the artifacts.
    Artifact { content: Value },

    /// `type: "response"`: the finalized narrative; replaces the body.
    Response { content: String },

    /// `type: "done"`: terminal marker.
    Done,

    /// An object without `type` that carries `content`. Older agent
    /// builds sent whole text blocks this way; folded like a token.
    Legacy { content: String },

    /// Any other discriminator. Ignored, kept for forward compatibility.
    Unknown { kind: Option<String> },
}

impl AgentEvent {
    /// Whether folding this event can change the message.
    pub fn mutates_message(&self) -> bool {
        !matches!(self, AgentEvent::Done | AgentEvent::Unknown { .. })
    }

    pub fn is_done(&self) -> bool {
        matches!(self, AgentEvent::Done)
    }

    /// Short name used in logs.
    pub fn kind(&self) -> &str {
        match self {
            AgentEvent::Token { .. } => "token",
            AgentEvent::Step(_) => "step",
            AgentEvent::Artifact { .. } => "artifact",
            AgentEvent::Response { .. } => "response",
            AgentEvent::Done => "done",
            AgentEvent::Legacy { .. } => "legacy",
            AgentEvent::Unknown { kind } => kind.as_deref().unwrap_or("untyped"),
        }
    }
}

/// The fields a `step` event carried. Absent fields leave the existing
/// step untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepPatch {
    pub id: String,
    pub title: Option<String>,
    pub status: Option<StepStatus>,
    pub content: Option<String>,
    pub output: Option<String>,
}

impl StepPatch {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn status(mut self, status: StepStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn output(mut self, output: impl Into<String>) -> Self {
        self.output = Some(output.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_done_and_unknown_leave_message_alone() {
        assert!(AgentEvent::Token { content: "a".into() }.mutates_message());
        assert!(AgentEvent::Step(StepPatch::new("s1")).mutates_message());
        assert!(AgentEvent::Artifact { content: Value::Null }.mutates_message());
        assert!(AgentEvent::Response { content: "b".into() }.mutates_message());
        assert!(AgentEvent::Legacy { content: "c".into() }.mutates_message());
        assert!(!AgentEvent::Done.mutates_message());
        assert!(!AgentEvent::Unknown { kind: Some("ping".into()) }.mutates_message());
    }

    #[test]
    fn kind_falls_back_to_untyped() {
        assert_eq!(AgentEvent::Unknown { kind: None }.kind(), "untyped");
        assert_eq!(AgentEvent::Unknown { kind: Some("ping".into()) }.kind(), "ping");
        assert_eq!(AgentEvent::Done.kind(), "done");
    }

    #[test]
    fn patch_builder_sets_fields() {
        let patch = StepPatch::new("exec")
            .title("Executing Code")
            .status(StepStatus::Failed)
            .output("Traceback ...");
        assert_eq!(patch.id, "exec");
        assert_eq!(patch.title.as_deref(), Some("Executing Code"));
        assert_eq!(patch.status, Some(StepStatus::Failed));
        assert!(patch.content.is_none());
        assert_eq!(patch.output.as_deref(), Some("Traceback ..."));
    }
}
