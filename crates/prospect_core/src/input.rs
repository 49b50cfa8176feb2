use serde::{Deserialize, Serialize};

/// Total assumed when a job is submitted without any data items.
pub const DEFAULT_EXPECTED_TOTAL: usize = 20;

/// Request body of the streaming start call.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JobInput {
    pub app_token: String,
    pub table_id: String,
    pub view_id: String,
    /// Id of the analysis plan the user picked.
    pub user_analysis_id: String,
    pub field_list: Vec<FieldRef>,
    pub data_items: Vec<DataItem>,
}

impl JobInput {
    /// Number of result records the job is expected to produce.
    pub fn expected_total(&self) -> usize {
        if self.data_items.is_empty() {
            DEFAULT_EXPECTED_TOTAL
        } else {
            self.data_items.len()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FieldRef {
    pub field_name: String,
    pub field_id: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DataItem {
    pub record_id: String,
    pub fields: Vec<RecordField>,
}

/// One `{fieldId, fieldName, fieldValue}` entry, used both in the request
/// body and in streamed result records.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecordField {
    pub field_id: String,
    pub field_name: String,
    pub field_value: serde_json::Value,
}
