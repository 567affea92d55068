//! Folding agent events into a message.

use ot_domain::{AgentEvent, Message, Step, StepPatch};

/// Apply one event to a message and return the next message state.
///
/// - `token` / legacy: append to `content`
/// - `step`: upsert by id, field-wise overwrite, position unchanged
/// - `artifact`: append
/// - `response`: replace `content`
/// - `done` / unknown: no change
pub fn apply(message: &Message, event: &AgentEvent) -> Message {
    let mut next = message.clone();
    match event {
        AgentEvent::Token { content } | AgentEvent::Legacy { content } => {
            next.content.push_str(content);
        }
        AgentEvent::Step(patch) => upsert_step(&mut next.steps, patch),
        AgentEvent::Artifact { content } => next.artifacts.push(content.clone()),
        AgentEvent::Response { content } => next.content.clone_from(content),
        AgentEvent::Done | AgentEvent::Unknown { .. } => {}
    }
    next
}

fn upsert_step(steps: &mut Vec<Step>, patch: &StepPatch) {
    match steps.iter_mut().find(|s| s.id == patch.id) {
        Some(step) => {
            if let Some(title) = &patch.title {
                step.title.clone_from(title);
            }
            if let Some(status) = patch.status {
                step.status = status;
            }
            if let Some(content) = &patch.content {
                step.content = Some(content.clone());
            }
            if let Some(output) = &patch.output {
                step.output = Some(output.clone());
            }
        }
        None => steps.push(Step {
            id: patch.id.clone(),
            title: patch.title.clone().unwrap_or_default(),
            status: patch.status.unwrap_or_default(),
            content: patch.content.clone(),
            output: patch.output.clone(),
        }),
    }
}
