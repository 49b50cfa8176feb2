use serde::Deserialize;
use serde_json::Value;

pub const CODE_SUCCESS: i64 = 200;
pub const CODE_TOKEN_EXPIRED: i64 = 4000;

/// `{ code, message, data }` wrapper returned by every non-stream endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Envelope {
    pub code: i64,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
}

impl Envelope {
    pub fn is_success(&self) -> bool {
        self.code == CODE_SUCCESS
    }

    pub fn is_token_expired(&self) -> bool {
        self.code == CODE_TOKEN_EXPIRED
    }

    pub fn message_or_default(&self) -> String {
        self.message.clone().unwrap_or_default()
    }

    /// Reads `data` as a yes/no answer: `true`, `"true"`, `"1"` or any non-zero number.
    pub fn data_is_truthy(&self) -> bool {
        match &self.data {
            Some(Value::Bool(flag)) => *flag,
            Some(Value::String(text)) => {
                let text = text.trim();
                text.eq_ignore_ascii_case("true") || text == "1"
            }
            Some(Value::Number(number)) => number.as_f64().is_some_and(|n| n != 0.0),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope(data: Value) -> Envelope {
        serde_json::from_value(json!({ "code": 200, "data": data })).unwrap()
    }

    #[test]
    fn truthiness() {
        assert!(envelope(json!(true)).data_is_truthy());
        assert!(envelope(json!("TRUE")).data_is_truthy());
        assert!(envelope(json!("1")).data_is_truthy());
        assert!(envelope(json!(2)).data_is_truthy());
        assert!(!envelope(json!(false)).data_is_truthy());
        assert!(!envelope(json!("no")).data_is_truthy());
        assert!(!envelope(json!(0)).data_is_truthy());
        assert!(!envelope(Value::Null).data_is_truthy());
    }

    #[test]
    fn message_and_data_are_optional() {
        let parsed: Envelope = serde_json::from_str(r#"{"code":4000}"#).unwrap();
        assert!(parsed.is_token_expired());
        assert_eq!(parsed.message, None);
        assert_eq!(parsed.data, None);
    }
}
