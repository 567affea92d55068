use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Agent server endpoints
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Where the analyst agent lives and how long to wait for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "d_base_url")]
    pub base_url: String,
    /// Turn-streaming endpoint.
    #[serde(default = "d_stream_path")]
    pub stream_path: String,
    /// Multipart dataset upload endpoint.
    #[serde(default = "d_upload_path")]
    pub upload_path: String,
    /// Non-streaming copilot chat endpoint.
    #[serde(default = "d_copilot_path")]
    pub copilot_path: String,
    /// TCP connect timeout. The stream itself has no overall timeout,
    /// see `stream.idle_timeout_ms`.
    #[serde(default = "d_10000u")]
    pub connect_timeout_ms: u64,
    /// Whole-request timeout for uploads and copilot calls.
    #[serde(default = "d_60000u")]
    pub request_timeout_ms: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            base_url: d_base_url(),
            stream_path: d_stream_path(),
            upload_path: d_upload_path(),
            copilot_path: d_copilot_path(),
            connect_timeout_ms: 10_000,
            request_timeout_ms: 60_000,
        }
    }
}

impl AgentConfig {
    /// Join the base URL with an endpoint path.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_base_url() -> String {
    "http://127.0.0.1:5000".into()
}

fn d_stream_path() -> String {
    "/api/agent/stream".into()
}

fn d_upload_path() -> String {
    "/api/agent/upload".into()
}

fn d_copilot_path() -> String {
    "/api/assistant/chat/copilot".into()
}

fn d_10000u() -> u64 {
    10_000
}

fn d_60000u() -> u64 {
    60_000
}
