//! Dataset upload: CSV text in, server-side handle out.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use ot_domain::config::AgentConfig;
use ot_domain::error::{Error, Result};
use ot_domain::DatasetHandle;

use crate::util::{request_client, snippet};

/// Sends a dataset to the agent service and returns its reference.
#[async_trait]
pub trait DatasetUploader: Send + Sync {
    async fn upload(&self, conversation_id: &str, csv: String) -> Result<DatasetHandle>;
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    file_path: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

pub struct HttpUploader {
    http: reqwest::Client,
    url: String,
}

impl HttpUploader {
    pub fn new(cfg: &AgentConfig) -> Result<Self> {
        Ok(Self {
            http: request_client(cfg)?,
            url: cfg.url(&cfg.upload_path),
        })
    }
}

#[async_trait]
impl DatasetUploader for HttpUploader {
    async fn upload(&self, conversation_id: &str, csv: String) -> Result<DatasetHandle> {
        let file = Part::text(csv)
            .file_name("dataset.csv")
            .mime_str("text/csv")
            .map_err(|e| Error::Upload(e.to_string()))?;
        let form = Form::new()
            .text("session_id", conversation_id.to_string())
            .part("file", file);

        let response = self
            .http
            .post(&self.url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::Upload(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Upload(e.to_string()))?;
        let parsed: Option<UploadResponse> = serde_json::from_str(&body).ok();

        if !status.is_success() {
            let detail = parsed
                .and_then(|r| r.error)
                .unwrap_or_else(|| snippet(&body));
            return Err(Error::Upload(format!("HTTP {status}: {detail}")));
        }

        let parsed = parsed
            .ok_or_else(|| Error::Upload(format!("unreadable response: {}", snippet(&body))))?;
        if parsed.status.as_deref() != Some("success") {
            return Err(Error::Upload(parsed.error.unwrap_or_else(|| {
                format!("status {:?}", parsed.status.unwrap_or_default())
            })));
        }
        match parsed.file_path {
            Some(path) if !path.is_empty() => Ok(DatasetHandle::new(path)),
            _ => Err(Error::Upload("response has no file_path".into())),
        }
    }
}
