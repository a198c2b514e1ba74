use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One raw input row, keyed by column name in file order
pub type Record = Map<String, Value>;

/// Output of the pipeline for one input record
///
/// Built once from a valid record and never mutated afterwards. `id` is
/// `"{dataset}_{row_index}"`, unique within a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedDataPoint {
    pub id: String,
    pub original_text: String,
    pub cleaned_text: String,
    pub normalized_text: String,
    pub tokens: Vec<String>,
    pub label: Option<String>,
    pub metadata: Map<String, Value>,
}

impl ProcessedDataPoint {
    pub fn make_id(dataset: &str, row_index: usize) -> String {
        format!("{}_{}", dataset, row_index)
    }

    /// Rough number of heap bytes held by this record's strings
    pub fn estimated_size(&self) -> usize {
        self.id.len()
            + self.original_text.len()
            + self.cleaned_text.len()
            + self.normalized_text.len()
            + self.tokens.iter().map(String::len).sum::<usize>()
            + self.label.as_ref().map_or(0, String::len)
    }
}

/// Render a cell value as a label. Null and nested values are not labels.
pub fn value_as_label(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
