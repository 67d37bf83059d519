use crate::{
    error::{ExtractionError, Result},
    models::{DishList, DishRecord},
};
use serde_json::{Map, Value};

const FENCE_OPEN: &str = "```json";
const FENCE_CLOSE: &str = "```";

/// Turns the model's full answer into dish records.
pub fn extract_dishes(text: &str) -> Result<DishList> {
    let body = strip_fences(text);

    let value: Value = serde_json::from_str(body).map_err(|e| ExtractionError::InvalidJson {
        raw: text.to_string(),
        reason: e.to_string(),
    })?;

    let object = value.as_object().ok_or_else(|| ExtractionError::InvalidJson {
        raw: text.to_string(),
        reason: format!("expected an object, got {}", json_type(&value)),
    })?;

    Ok(map_dishes(object)?)
}

/// Removes a surrounding ```json ... ``` block. Text without both markers is
/// returned as is.
pub fn strip_fences(text: &str) -> &str {
    let trimmed = text.trim();
    if trimmed.len() >= FENCE_OPEN.len() + FENCE_CLOSE.len()
        && trimmed.starts_with(FENCE_OPEN)
        && trimmed.ends_with(FENCE_CLOSE)
    {
        trimmed[FENCE_OPEN.len()..trimmed.len() - FENCE_CLOSE.len()].trim()
    } else {
        text
    }
}

fn map_dishes(object: &Map<String, Value>) -> std::result::Result<DishList, ExtractionError> {
    // `{}` is the model's answer when none of the dishes are on the menu.
    let Some(dishes) = object.get("dishes") else {
        return Ok(DishList::new());
    };

    let entries = dishes
        .as_array()
        .ok_or_else(|| ExtractionError::MalformedDishEntry {
            index: None,
            reason: format!("\"dishes\" must be an array, got {}", json_type(dishes)),
        })?;

    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| -> std::result::Result<DishRecord, ExtractionError> {
            let fields = entry
                .as_object()
                .ok_or_else(|| ExtractionError::MalformedDishEntry {
                    index: Some(index),
                    reason: format!("expected an object, got {}", json_type(entry)),
                })?;
            Ok(DishRecord {
                name: string_field(fields, "name", index)?,
                price: string_field(fields, "price", index)?,
            })
        })
        .collect()
}

fn string_field(
    fields: &Map<String, Value>,
    key: &str,
    index: usize,
) -> std::result::Result<String, ExtractionError> {
    match fields.get(key) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(ExtractionError::MalformedDishEntry {
            index: Some(index),
            reason: format!("\"{}\" must be a string, got {}", key, json_type(other)),
        }),
        None => Err(ExtractionError::MalformedDishEntry {
            index: Some(index),
            reason: format!("missing \"{}\"", key),
        }),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
