use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Tabular data the user is analysing, shipped to the agent once per
/// conversation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Dataset {
    /// Build a dataset from JSON records.
    ///
    /// Columns are the keys of the first record, in the order they were
    /// written; later records missing a column get `null` in that cell,
    /// extra keys are ignored.
    pub fn from_records(records: &[Map<String, Value>]) -> Self {
        let Some(first) = records.first() else {
            return Self::default();
        };
        let columns: Vec<String> = first.keys().cloned().collect();
        let rows = records
            .iter()
            .map(|record| {
                columns
                    .iter()
                    .map(|col| record.get(col).cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .collect();
        Self { columns, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// Server-side reference to an uploaded dataset, reused by every turn of
/// the conversation that uploaded it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetHandle {
    pub path: String,
}

impl DatasetHandle {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}
