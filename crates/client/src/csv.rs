//! Dataset → upload text.
//!
//! Header cells are written bare.  Every data cell is written as its JSON
//! literal (strings quoted, numbers bare), with a missing value written as
//! an empty quoted string.  Rows are joined by `\n` with no trailing
//! newline.

use serde_json::Value;

use ot_domain::Dataset;

pub fn encode_csv(dataset: &Dataset) -> String {
    if dataset.is_empty() {
        return String::new();
    }

    let mut lines = Vec::with_capacity(dataset.row_count() + 1);
    lines.push(dataset.columns.join(","));
    for row in &dataset.rows {
        let cells: Vec<String> = (0..dataset.columns.len())
            .map(|i| encode_cell(row.get(i)))
            .collect();
        lines.push(cells.join(","));
    }
    lines.join("\n")
}

fn encode_cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "\"\"".to_string(),
        Some(v) => v.to_string(),
    }
}
