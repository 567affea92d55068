//! Shared helpers for the HTTP clients.

use std::time::Duration;

use ot_domain::config::AgentConfig;
use ot_domain::error::{Error, Result};

/// Convert a [`reqwest::Error`] into the domain [`Error`] type.
///
/// Timeout errors map to [`Error::Timeout`]; everything else maps to
/// [`Error::Http`].
pub(crate) fn from_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(e.to_string())
    } else {
        Error::Http(e.to_string())
    }
}

/// Build a client for one-shot calls (upload, copilot) bounded by the
/// whole-request timeout.
pub(crate) fn request_client(cfg: &AgentConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_millis(cfg.connect_timeout_ms))
        .timeout(Duration::from_millis(cfg.request_timeout_ms))
        .build()
        .map_err(from_reqwest)
}

/// Build a client for long-lived streams: connect timeout only.
pub(crate) fn stream_client(cfg: &AgentConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_millis(cfg.connect_timeout_ms))
        .build()
        .map_err(from_reqwest)
}

/// Trim a response body for inclusion in an error message.
pub(crate) fn snippet(body: &str) -> String {
    const MAX: usize = 200;
    let body = body.trim();
    if body.len() <= MAX {
        return body.to_string();
    }
    let mut end = MAX;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &body[..end])
}
