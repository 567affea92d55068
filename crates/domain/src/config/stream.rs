use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Streaming turns
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Controls how turn streams are decoded and how turns are scheduled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Literal prefix every frame must start with. Frames without it are
    /// dropped.
    #[serde(default = "d_frame_prefix")]
    pub frame_prefix: String,
    /// Text shown to the user when a turn fails. Appended after any
    /// partial content that already streamed in.
    #[serde(default = "d_failure_notice")]
    pub failure_notice: String,
    /// Maximum silence between two chunks before the turn is failed.
    /// `None` waits forever.
    #[serde(default = "d_idle_timeout")]
    pub idle_timeout_ms: Option<u64>,
    /// Buffered turn updates before the turn task waits on the consumer.
    #[serde(default = "d_64")]
    pub channel_capacity: usize,
    /// What to do when a turn is started while another one is in flight
    /// on the same conversation.
    #[serde(default)]
    pub overlap: OverlapPolicy,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            frame_prefix: d_frame_prefix(),
            failure_notice: d_failure_notice(),
            idle_timeout_ms: d_idle_timeout(),
            channel_capacity: 64,
            overlap: OverlapPolicy::Reject,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapPolicy {
    /// Refuse the new turn with a busy error.
    #[default]
    Reject,
    /// Cancel the running turn, wait for it to wind down, then start.
    CancelPrevious,
}

fn d_frame_prefix() -> String {
    "data: ".into()
}

fn d_failure_notice() -> String {
    "The analyst agent ran into a problem. Please try again.".into()
}

fn d_idle_timeout() -> Option<u64> {
    Some(300_000)
}

fn d_64() -> usize {
    64
}
