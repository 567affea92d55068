use serde::Serialize;

/// Structured trace events emitted across all OnThesis crates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    TurnStarted {
        conversation: String,
        turn_id: String,
        has_dataset: bool,
    },
    AssetUploaded {
        conversation: String,
        path: String,
        bytes: usize,
        duration_ms: u64,
    },
    AssetReused {
        conversation: String,
        path: String,
    },
    FrameDropped {
        turn_id: String,
        reason: String,
    },
    TurnFinished {
        conversation: String,
        turn_id: String,
        outcome: String,
        steps: usize,
        artifacts: usize,
        content_chars: usize,
        malformed_frames: usize,
        duration_ms: u64,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "ot_event");
    }
}
