// Boundary validation for label identification output
use crate::model::{Auditable, ClassifyError, DetectedObject, DetectionResult};
use crate::utils::strip_code_fence;
use serde::Deserialize;
use serde_json::{Map, Number, Value};

/// Parses the raw response text of the identification service.
/// The service tends to wrap its JSON in a Markdown code fence.
pub fn parse_detection(text: &str) -> Result<DetectionResult, ClassifyError> {
    let body = strip_code_fence(text);
    let value: Value = serde_json::from_str(body)
        .map_err(|e| ClassifyError::InvalidInput(format!("response is not valid JSON: {}", e)))?;
    DetectionResult::from_value(&value)
}

impl DetectionResult {
    /// Single validation pass over an untyped detection payload.
    pub fn from_value(value: &Value) -> Result<Self, ClassifyError> {
        let record = value.as_object().ok_or_else(|| {
            ClassifyError::InvalidInput(format!(
                "detection must be an object, got {}",
                kind_of(value)
            ))
        })?;

        Ok(Self {
            chargeability_percentage: parse_chargeability(record)?,
            auditable: parse_auditable(record)?,
            objects: parse_objects(record)?,
        })
    }
}

fn parse_chargeability(record: &Map<String, Value>) -> Result<Option<Number>, ClassifyError> {
    match record.get("chargeability_percentage") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(Some(n.clone())),
        Some(other) => Err(ClassifyError::InvalidInput(format!(
            "chargeability_percentage must be a number, got {}",
            kind_of(other)
        ))),
    }
}

fn parse_auditable(record: &Map<String, Value>) -> Result<Option<Auditable>, ClassifyError> {
    match record.get("auditable") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(flag)) => Ok(Some(Auditable::Flag(*flag))),
        Some(Value::String(text)) => Ok(Some(Auditable::Text(text.clone()))),
        Some(other) => Err(ClassifyError::InvalidInput(format!(
            "auditable must be a string or boolean, got {}",
            kind_of(other)
        ))),
    }
}

fn parse_objects(record: &Map<String, Value>) -> Result<Vec<DetectedObject>, ClassifyError> {
    let entries = match record.get("objects") {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(entries)) => entries,
        Some(other) => {
            return Err(ClassifyError::InvalidInput(format!(
                "objects must be an array, got {}",
                kind_of(other)
            )));
        }
    };

    entries
        .iter()
        .enumerate()
        .map(|(idx, entry)| {
            if !entry.is_object() {
                return Err(ClassifyError::InvalidInput(format!(
                    "objects[{}] must be an object, got {}",
                    idx,
                    kind_of(entry)
                )));
            }
            DetectedObject::deserialize(entry)
                .map_err(|e| ClassifyError::InvalidInput(format!("objects[{}]: {}", idx, e)))
        })
        .collect()
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
