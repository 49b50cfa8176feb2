use serde_json::Value;

use crate::input::RecordField;

/// Marker carried in the `event` field of a job-id announcement.
///
/// Servers in the field send both `REQUEST_ID` and `request_id`; matching is
/// ASCII case-insensitive so both are accepted.
pub const JOB_ID_MARKER: &str = "request_id";

/// A streamed payload after classification.
#[derive(Debug, Clone, PartialEq)]
pub enum JobEvent {
    /// The server announced the id assigned to this job.
    JobId(String),
    /// A processed record.
    Record(RecordEvent),
    /// Valid JSON that matches no known shape.
    Unrecognized(Value),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordEvent {
    pub record_id: String,
    pub fields: Vec<RecordField>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EventParseError {
    #[error("payload is not valid json: {0}")]
    InvalidJson(String),
    #[error("job id announcement without a job id")]
    MissingJobId,
    #[error("record event without a record id")]
    MissingRecordId,
    #[error("record event has malformed fields: {0}")]
    MalformedFields(String),
}

/// Parses one `data:` payload and classifies it.
pub fn classify(payload: &str) -> Result<JobEvent, EventParseError> {
    let value: Value = serde_json::from_str(payload)
        .map_err(|err| EventParseError::InvalidJson(err.to_string()))?;

    let is_job_id = value
        .get("event")
        .and_then(Value::as_str)
        .is_some_and(|name| name.trim().eq_ignore_ascii_case(JOB_ID_MARKER));
    if is_job_id {
        return match value.get("data").and_then(Value::as_str).map(str::trim) {
            Some(id) if !id.is_empty() => Ok(JobEvent::JobId(id.to_string())),
            _ => Err(EventParseError::MissingJobId),
        };
    }

    let Some(data) = value.get("data").filter(|data| data.get("fields").is_some_and(Value::is_array))
    else {
        return Ok(JobEvent::Unrecognized(value));
    };

    let record_id = match data.get("recordId").and_then(Value::as_str) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => return Err(EventParseError::MissingRecordId),
    };
    let fields: Vec<RecordField> = serde_json::from_value(data["fields"].clone())
        .map_err(|err| EventParseError::MalformedFields(err.to_string()))?;

    Ok(JobEvent::Record(RecordEvent { record_id, fields }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn both_job_id_spellings_are_accepted() {
        for marker in ["REQUEST_ID", "request_id", "Request_Id"] {
            let payload = json!({ "event": marker, "data": "job-42" }).to_string();
            assert_eq!(classify(&payload), Ok(JobEvent::JobId("job-42".to_string())));
        }
    }

    #[test]
    fn job_id_announcement_requires_an_id() {
        let payload = json!({ "event": "REQUEST_ID", "data": "" }).to_string();
        assert_eq!(classify(&payload), Err(EventParseError::MissingJobId));
        let payload = json!({ "event": "REQUEST_ID" }).to_string();
        assert_eq!(classify(&payload), Err(EventParseError::MissingJobId));
    }

    #[test]
    fn record_event_extracts_fields() {
        let payload = json!({
            "data": {
                "recordId": "R1",
                "fields": [
                    { "fieldId": "f1", "fieldName": "企业名称", "fieldValue": "Acme" },
                    { "fieldId": "f2", "fieldName": "综合评分", "fieldValue": 88 }
                ]
            }
        })
        .to_string();

        let JobEvent::Record(record) = classify(&payload).unwrap() else {
            panic!("expected a record event");
        };
        assert_eq!(record.record_id, "R1");
        assert_eq!(record.fields.len(), 2);
        assert_eq!(record.fields[1].field_value, json!(88));
    }

    #[test]
    fn other_shapes_are_unrecognized() {
        let payload = json!({ "event": "heartbeat", "data": { "n": 1 } }).to_string();
        assert!(matches!(classify(&payload), Ok(JobEvent::Unrecognized(_))));
        assert!(matches!(classify("[1,2]"), Ok(JobEvent::Unrecognized(_))));
    }

    #[test]
    fn malformed_payloads_are_errors() {
        assert!(matches!(classify("{not json"), Err(EventParseError::InvalidJson(_))));
        let payload = json!({ "data": { "fields": [] } }).to_string();
        assert_eq!(classify(&payload), Err(EventParseError::MissingRecordId));
        let payload = json!({ "data": { "recordId": "R1", "fields": [1] } }).to_string();
        assert!(matches!(classify(&payload), Err(EventParseError::MalformedFields(_))));
    }
}
