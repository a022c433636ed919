use std::fmt;

/// Key of a mapping or object field.
///
/// The platform's arrays accept both integer and string keys, and keep
/// them distinct in the encoded form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MapKey {
    Int(i64),
    Str(String),
}

impl MapKey {
    /// Compare against a string key, treating integer keys by their
    /// decimal rendering.
    pub fn matches(&self, name: &str) -> bool {
        match self {
            MapKey::Str(s) => s == name,
            MapKey::Int(i) => name.parse::<i64>().map(|n| n == *i).unwrap_or(false),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            MapKey::Str(s) => Some(s),
            MapKey::Int(_) => None,
        }
    }
}

impl fmt::Display for MapKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapKey::Int(i) => write!(f, "{}", i),
            MapKey::Str(s) => f.write_str(s),
        }
    }
}

impl From<&str> for MapKey {
    fn from(s: &str) -> Self {
        MapKey::Str(s.to_string())
    }
}

impl From<String> for MapKey {
    fn from(s: String) -> Self {
        MapKey::Str(s)
    }
}

impl From<i64> for MapKey {
    fn from(i: i64) -> Self {
        MapKey::Int(i)
    }
}

/// A decoded metadata or layout value.
///
/// Mappings and object fields keep insertion order, which the transport
/// encoding preserves and the page builder relies on for node ordering.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Seq(Vec<Value>),
    Map(Vec<(MapKey, Value)>),
    /// A named record (`stdClass` and friends). Layout nodes and their
    /// settings are stored this way.
    Object {
        class: String,
        fields: Vec<(MapKey, Value)>,
    },
}

impl Value {
    /// Returns a human-readable type name for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Seq(_) => "sequence",
            Value::Map(_) => "mapping",
            Value::Object { .. } => "object",
        }
    }

    /// Build an empty `stdClass` object.
    pub fn object() -> Self {
        Value::Object {
            class: "stdClass".to_string(),
            fields: Vec::new(),
        }
    }

    /// True for mappings, sequences and objects.
    pub fn is_structured(&self) -> bool {
        matches!(self, Value::Seq(_) | Value::Map(_) | Value::Object { .. })
    }

    /// True for null, empty strings and empty containers.
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Str(s) => s.is_empty(),
            Value::Seq(items) => items.is_empty(),
            Value::Map(entries) => entries.is_empty(),
            Value::Object { fields, .. } => fields.is_empty(),
            Value::Bool(_) | Value::Int(_) | Value::Float(_) => false,
        }
    }

    /// Loose truthiness in the platform's sense: `"0"`, `""`, `0`, `false`
    /// and empty containers are false.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !(s.is_empty() || s == "0"),
            other => !other.is_empty(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Str(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Key/value entries of a mapping or object.
    pub fn entries(&self) -> Option<&[(MapKey, Value)]> {
        match self {
            Value::Map(entries) => Some(entries),
            Value::Object { fields, .. } => Some(fields),
            _ => None,
        }
    }

    pub fn entries_mut(&mut self) -> Option<&mut Vec<(MapKey, Value)>> {
        match self {
            Value::Map(entries) => Some(entries),
            Value::Object { fields, .. } => Some(fields),
            _ => None,
        }
    }

    /// Look up a field of a mapping or object by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries()?
            .iter()
            .find(|(k, _)| k.matches(name))
            .map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.entries_mut()?
            .iter_mut()
            .find(|(k, _)| k.matches(name))
            .map(|(_, v)| v)
    }

    /// Set a field on a mapping or object, replacing an existing entry in
    /// place or appending a new one. Returns `false` for scalars and
    /// sequences, which have no named fields.
    pub fn set(&mut self, name: &str, value: Value) -> bool {
        let Some(entries) = self.entries_mut() else {
            return false;
        };
        match entries.iter_mut().find(|(k, _)| k.matches(name)) {
            Some((_, slot)) => *slot = value,
            None => entries.push((MapKey::Str(name.to_string()), value)),
        }
        true
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node() -> Value {
        Value::Object {
            class: "stdClass".to_string(),
            fields: vec![
                ("node".into(), Value::from("abc")),
                ("parent".into(), Value::Null),
            ],
        }
    }

    #[test]
    fn test_get_and_set_on_object() {
        let mut v = node();
        assert_eq!(v.get("node"), Some(&Value::from("abc")));
        assert!(v.set("parent", Value::from("root")));
        assert!(v.set("position", Value::Int(2)));
        assert_eq!(v.get("parent"), Some(&Value::from("root")));
        assert_eq!(v.entries().map(|e| e.len()), Some(3));
    }

    #[test]
    fn test_set_on_scalar_is_rejected() {
        let mut v = Value::Int(3);
        assert!(!v.set("x", Value::Null));
    }

    #[test]
    fn test_integer_key_matches_decimal_name() {
        let v = Value::Map(vec![(MapKey::Int(7), Value::from("seven"))]);
        assert_eq!(v.get("7"), Some(&Value::from("seven")));
        assert_eq!(v.get("07"), Some(&Value::from("seven")));
        assert!(v.get("eight").is_none());
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::from("0").is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(Value::from("1").is_truthy());
        assert!(!Value::Seq(vec![]).is_truthy());
        assert!(Value::Int(-1).is_truthy());
    }
}
