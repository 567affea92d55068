//! Frame payload → [`AgentEvent`].

use serde_json::{Map, Value};

use ot_domain::{AgentEvent, StepPatch, StepStatus};

/// Why a frame payload could not be turned into an event.
///
/// Always recoverable: the caller skips the frame and keeps reading.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("payload is not a JSON object")]
    NotAnObject,

    #[error("`type` must be a string")]
    InvalidType,

    #[error("{kind} event is missing `{field}`")]
    MissingField {
        kind: &'static str,
        field: &'static str,
    },

    #[error("{kind} event has invalid `{field}`: {reason}")]
    InvalidField {
        kind: &'static str,
        field: &'static str,
        reason: String,
    },
}

/// Parse one frame payload.
///
/// | `type`     | required                 |
/// |------------|--------------------------|
/// | `token`    | `content: string`        |
/// | `step`     | `id: string`             |
/// | `artifact` | `content` (any JSON)     |
/// | `response` | `content: string`        |
/// | `done`     | --                       |
/// | absent     | `content: string` → `Legacy` |
///
/// Any other `type` string parses to [`AgentEvent::Unknown`].
pub fn parse_event(payload: &str) -> Result<AgentEvent, ParseError> {
    let value: Value = serde_json::from_str(payload)?;
    let Value::Object(mut obj) = value else {
        return Err(ParseError::NotAnObject);
    };

    // An empty or null `type` counts as no type at all.
    let kind = match obj.remove("type") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.is_empty() => None,
        Some(Value::String(s)) => Some(s),
        Some(_) => return Err(ParseError::InvalidType),
    };

    match kind.as_deref() {
        Some("token") => Ok(AgentEvent::Token {
            content: required_string(&mut obj, "token", "content")?,
        }),
        Some("step") => parse_step(obj).map(AgentEvent::Step),
        Some("artifact") => match obj.remove("content") {
            Some(content) => Ok(AgentEvent::Artifact { content }),
            None => Err(ParseError::MissingField {
                kind: "artifact",
                field: "content",
            }),
        },
        Some("response") => Ok(AgentEvent::Response {
            content: required_string(&mut obj, "response", "content")?,
        }),
        Some("done") => Ok(AgentEvent::Done),
        Some(_) => Ok(AgentEvent::Unknown { kind }),
        None => match obj.remove("content") {
            Some(Value::String(content)) => Ok(AgentEvent::Legacy { content }),
            _ => Ok(AgentEvent::Unknown { kind: None }),
        },
    }
}

fn parse_step(mut obj: Map<String, Value>) -> Result<StepPatch, ParseError> {
    let id = required_string(&mut obj, "step", "id")?;

    let title = match obj.remove("title") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => {
            return Err(ParseError::InvalidField {
                kind: "step",
                field: "title",
                reason: format!("expected string, got {other}"),
            })
        }
    };

    let status = match obj.remove("status") {
        None | Some(Value::Null) => None,
        Some(raw) => Some(serde_json::from_value::<StepStatus>(raw).map_err(|e| {
            ParseError::InvalidField {
                kind: "step",
                field: "status",
                reason: e.to_string(),
            }
        })?),
    };

    Ok(StepPatch {
        id,
        title,
        status,
        content: detail_text(obj.remove("content")),
        output: detail_text(obj.remove("output")),
    })
}

fn required_string(
    obj: &mut Map<String, Value>,
    kind: &'static str,
    field: &'static str,
) -> Result<String, ParseError> {
    match obj.remove(field) {
        Some(Value::String(s)) => Ok(s),
        None | Some(Value::Null) => Err(ParseError::MissingField { kind, field }),
        Some(other) => Err(ParseError::InvalidField {
            kind,
            field,
            reason: format!("expected string, got {other}"),
        }),
    }
}

/// Step details are shown verbatim; non-string values are rendered as
/// compact JSON rather than rejected.
fn detail_text(value: Option<Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}
