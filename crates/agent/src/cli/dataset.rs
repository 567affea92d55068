//! Reading `--dataset` files.

use std::path::Path;

use anyhow::Context;
use serde_json::{Map, Value};

use ot_domain::Dataset;

/// Accepts either a JSON array of records or a `{columns, rows}` object.
pub fn load_dataset(path: &Path) -> anyhow::Result<Dataset> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading dataset {}", path.display()))?;
    parse_dataset(&raw).with_context(|| format!("parsing dataset {}", path.display()))
}

pub fn parse_dataset(raw: &str) -> anyhow::Result<Dataset> {
    let value: Value = serde_json::from_str(raw)?;
    match value {
        Value::Array(items) => {
            let records = items
                .into_iter()
                .map(|item| match item {
                    Value::Object(map) => Ok(map),
                    other => anyhow::bail!("expected an object per record, got {other}"),
                })
                .collect::<anyhow::Result<Vec<Map<String, Value>>>>()?;
            Ok(Dataset::from_records(&records))
        }
        Value::Object(_) => Ok(serde_json::from_value(value)?),
        _ => anyhow::bail!("expected an array of records or a {{columns, rows}} object"),
    }
}
