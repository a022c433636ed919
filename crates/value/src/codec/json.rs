//! JSON as an alternate transport encoding.
//!
//! Objects carry their class name under [`CLASS_FIELD`]. JSON object keys
//! are always strings, so integer mapping keys come back as string keys.

use serde_json::{Map, Number};

use super::{Codec, CodecError};
use crate::{MapKey, Value};

/// Field holding the class name of an encoded [`Value::Object`].
pub const CLASS_FIELD: &str = "__class";

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn name(&self) -> &'static str {
        "json"
    }

    fn encode(&self, value: &Value) -> String {
        to_json(value).to_string()
    }

    fn decode(&self, raw: &str) -> Result<Value, CodecError> {
        let json: serde_json::Value =
            serde_json::from_str(raw).map_err(|e| CodecError::Malformed(e.to_string()))?;
        Ok(from_json(&json))
    }

    fn looks_encoded(&self, raw: &str) -> bool {
        let t = raw.trim();
        (t.starts_with('{') && t.ends_with('}')) || (t.starts_with('[') && t.ends_with(']'))
    }
}

/// Convert a [`Value`] into its JSON form. Non-finite floats become `null`.
pub fn to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Int(i) => serde_json::Value::Number((*i).into()),
        Value::Float(f) => Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::Str(s) => serde_json::Value::String(s.clone()),
        Value::Seq(items) => serde_json::Value::Array(items.iter().map(to_json).collect()),
        Value::Map(entries) => serde_json::Value::Object(entries_to_json(entries)),
        Value::Object { class, fields } => {
            let mut map = Map::new();
            map.insert(
                CLASS_FIELD.to_string(),
                serde_json::Value::String(class.clone()),
            );
            map.extend(entries_to_json(fields));
            serde_json::Value::Object(map)
        }
    }
}

/// Convert JSON into a [`Value`], restoring objects tagged with
/// [`CLASS_FIELD`].
pub fn from_json(json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        serde_json::Value::String(s) => Value::Str(s.clone()),
        serde_json::Value::Array(items) => Value::Seq(items.iter().map(from_json).collect()),
        serde_json::Value::Object(map) => {
            let class = map.get(CLASS_FIELD).and_then(|c| c.as_str());
            let fields = map
                .iter()
                .filter(|(k, _)| class.is_none() || k.as_str() != CLASS_FIELD)
                .map(|(k, v)| (MapKey::Str(k.clone()), from_json(v)))
                .collect();
            match class {
                Some(class) => Value::Object {
                    class: class.to_string(),
                    fields,
                },
                None => Value::Map(fields),
            }
        }
    }
}

fn entries_to_json(entries: &[(MapKey, Value)]) -> Map<String, serde_json::Value> {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), to_json(v)))
        .collect()
}
