//! Request payload construction and validation

use serde_json::{Map, Value};

use crate::store::{StoreError, StoreResult};

/// Checks that `json` is a single JSON object.
pub fn validate_object(json: &str) -> StoreResult<()> {
    match serde_json::from_str::<Value>(json) {
        Ok(Value::Object(_)) => Ok(()),
        Ok(_) => Err(StoreError::validation("payload must be a JSON object")),
        Err(e) => Err(StoreError::validation(format!("invalid JSON: {}", e))),
    }
}

/// `{"f1":true,"f2":true,...}` in argument order.
pub fn inc_payload<S: AsRef<str>>(fields: &[S]) -> String {
    let mut object = Map::new();
    for field in fields {
        object.insert(field.as_ref().to_string(), Value::Bool(true));
    }
    Value::Object(object).to_string()
}

/// `{"f1":n1,"f2":n2,...}` from `field count` pairs, in argument order.
///
/// `first_position` is the 1-based position of the first field in the full
/// command line, used to point at a bad count.
pub fn incby_payload<S: AsRef<str>>(pairs: &[S], first_position: usize) -> StoreResult<String> {
    if pairs.is_empty() || pairs.len() % 2 != 0 {
        return Err(StoreError::validation("field and count must come in pairs"));
    }

    let mut object = Map::new();
    for (i, pair) in pairs.chunks(2).enumerate() {
        let field = pair[0].as_ref();
        let raw = pair[1].as_ref();
        let count: i64 = raw.parse().map_err(|_| {
            StoreError::validation(format!(
                "invalid count '{}' at argument {}",
                raw,
                first_position + 2 * i + 1
            ))
        })?;
        object.insert(field.to_string(), Value::from(count));
    }
    Ok(Value::Object(object).to_string())
}
