//! Non-streaming research copilot.
//!
//! One request, one reply.  The service answers with either a reply body
//! or `{ "error": "..." }`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use ot_domain::config::AgentConfig;
use ot_domain::error::{Error, Result};
use ot_domain::{Message, Role};

use crate::util::{from_reqwest, request_client, snippet};

/// How many earlier messages are sent along as history.
pub const HISTORY_WINDOW: usize = 8;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CopilotRequest {
    pub message: String,
    pub context: Value,
    pub history: Vec<HistoryEntry>,
}

impl CopilotRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: Value::Object(Default::default()),
            history: Vec::new(),
        }
    }

    pub fn context(mut self, context: Value) -> Self {
        self.context = context;
        self
    }

    /// Attach the tail of a conversation, oldest first.
    pub fn history(mut self, messages: &[Message]) -> Self {
        let start = messages.len().saturating_sub(HISTORY_WINDOW);
        self.history = messages[start..]
            .iter()
            .map(|m| HistoryEntry {
                role: m.role,
                content: m.content.clone(),
            })
            .collect();
        self
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SuggestedAction {
    pub label: String,
    pub action: String,
    #[serde(default)]
    pub params: Value,
    #[serde(default)]
    pub badge: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CopilotReply {
    pub text: String,
    #[serde(default)]
    pub suggested_actions: Vec<SuggestedAction>,
    #[serde(default)]
    pub reasoning: Option<String>,
    #[serde(default)]
    pub artifacts: Vec<Value>,
}

#[async_trait]
pub trait CopilotClient: Send + Sync {
    async fn ask(&self, request: &CopilotRequest) -> Result<CopilotReply>;
}

pub struct HttpCopilot {
    http: reqwest::Client,
    url: String,
}

impl HttpCopilot {
    pub fn new(cfg: &AgentConfig) -> Result<Self> {
        Ok(Self {
            http: request_client(cfg)?,
            url: cfg.url(&cfg.copilot_path),
        })
    }
}

#[async_trait]
impl CopilotClient for HttpCopilot {
    async fn ask(&self, request: &CopilotRequest) -> Result<CopilotReply> {
        let response = self
            .http
            .post(&self.url)
            .json(request)
            .send()
            .await
            .map_err(from_reqwest)?;
        let status = response.status();
        let body = response.text().await.map_err(from_reqwest)?;

        let value: Value = serde_json::from_str(&body).map_err(|_| {
            Error::Http(format!("{} returned {status}: {}", self.url, snippet(&body)))
        })?;
        parse_reply(value)
    }
}

fn parse_reply(value: Value) -> Result<CopilotReply> {
    if let Some(err) = value.get("error").filter(|e| !e.is_null()) {
        let text = err
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| err.to_string());
        return Err(Error::Other(format!("copilot error: {text}")));
    }
    Ok(serde_json::from_value(value)?)
}
