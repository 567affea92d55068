//! Terminal rendering shared by `run` and `chat`.
//!
//! Progress goes to stderr; only the answer goes to stdout.

use std::collections::HashMap;

use ot_domain::{Message, StepStatus};

use crate::runtime::NoticeLevel;

/// Prints a line to stderr whenever a step appears or changes status.
#[derive(Default)]
pub struct StepPrinter {
    seen: HashMap<String, StepStatus>,
}

impl StepPrinter {
    pub fn show(&mut self, message: &Message) {
        for line in self.changes(message) {
            eprintln!("{line}");
        }
    }

    fn changes(&mut self, message: &Message) -> Vec<String> {
        let mut lines = Vec::new();
        for step in &message.steps {
            if self.seen.get(&step.id) == Some(&step.status) {
                continue;
            }
            self.seen.insert(step.id.clone(), step.status);
            let title = if step.title.is_empty() {
                step.id.as_str()
            } else {
                step.title.as_str()
            };
            lines.push(format!("\x1b[2m{} {title}\x1b[0m", marker(step.status)));
        }
        lines
    }
}

fn marker(status: StepStatus) -> &'static str {
    match status {
        StepStatus::Pending => "·",
        StepStatus::Running => "▸",
        StepStatus::Completed => "✓",
        StepStatus::Failed => "✗",
    }
}

pub fn notice(level: NoticeLevel, text: &str) {
    match level {
        NoticeLevel::Info => eprintln!("\x1b[2m{text}\x1b[0m"),
        NoticeLevel::Warn => eprintln!("\x1b[33mwarning: {text}\x1b[0m"),
    }
}

/// One line per artifact, by its `type` field when it has one.
pub fn artifacts(message: &Message) {
    for artifact in &message.artifacts {
        let kind = artifact
            .get("type")
            .and_then(|t| t.as_str())
            .unwrap_or("artifact");
        let title = artifact.get("title").and_then(|t| t.as_str()).unwrap_or("");
        eprintln!("\x1b[2m[{kind}] {title}\x1b[0m");
    }
}
