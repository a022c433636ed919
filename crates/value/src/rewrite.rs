use std::collections::BTreeMap;

use crate::Value;

/// Correspondence tables from source-tenant attachment references to their
/// destination-tenant equivalents.
///
/// Built incrementally while attachments are migrated, then only read.
/// URL pairs keep insertion order because substitution is applied pair by
/// pair over the whole subject.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceMaps {
    ids: BTreeMap<i64, i64>,
    urls: Vec<(String, String)>,
}

impl ReferenceMaps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_id(&mut self, old: i64, new: i64) {
        self.ids.insert(old, new);
    }

    /// Record `old -> new`. Re-inserting an existing URL replaces its target
    /// without changing its position.
    pub fn insert_url(&mut self, old: impl Into<String>, new: impl Into<String>) {
        let old = old.into();
        let new = new.into();
        match self.urls.iter_mut().find(|(k, _)| *k == old) {
            Some((_, target)) => *target = new,
            None => self.urls.push((old, new)),
        }
    }

    pub fn id(&self, old: i64) -> Option<i64> {
        self.ids.get(&old).copied()
    }

    pub fn url(&self, old: &str) -> Option<&str> {
        self.urls
            .iter()
            .find(|(k, _)| k == old)
            .map(|(_, v)| v.as_str())
    }

    pub fn ids(&self) -> &BTreeMap<i64, i64> {
        &self.ids
    }

    pub fn urls(&self) -> &[(String, String)] {
        &self.urls
    }

    /// True when neither table has an entry.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty() && self.urls.is_empty()
    }

    pub fn has_urls(&self) -> bool {
        !self.urls.is_empty()
    }

    /// Replace every occurrence of every mapped URL inside `subject`.
    pub fn replace_urls(&self, subject: &str) -> String {
        let mut out = subject.to_string();
        for (old, new) in &self.urls {
            if !old.is_empty() && out.contains(old.as_str()) {
                out = out.replace(old.as_str(), new);
            }
        }
        out
    }

    /// Return a copy of `value` with every attachment reference rewritten.
    pub fn rewrite(&self, value: &Value) -> Value {
        let mut out = value.clone();
        self.rewrite_in_place(&mut out);
        out
    }

    /// Rewrite attachment references throughout `value`.
    ///
    /// Containers are walked recursively; keys are never touched. Integers
    /// (and floats truncated to integers) found in the id table are
    /// replaced, as are strings that are a bare decimal id. Any other string
    /// has every mapped URL substituted.
    pub fn rewrite_in_place(&self, value: &mut Value) {
        if self.is_empty() {
            return;
        }
        match value {
            Value::Seq(items) => {
                for item in items {
                    self.rewrite_in_place(item);
                }
            }
            Value::Map(entries) | Value::Object { fields: entries, .. } => {
                for (_, v) in entries {
                    self.rewrite_in_place(v);
                }
            }
            Value::Null | Value::Bool(_) => {}
            Value::Int(i) => {
                if let Some(new) = self.id(*i) {
                    *i = new;
                }
            }
            Value::Float(f) => {
                let mapped = if f.is_finite() {
                    self.id(f.trunc() as i64)
                } else {
                    None
                };
                if let Some(new) = mapped {
                    *value = Value::Int(new);
                }
            }
            Value::Str(s) => {
                if let Some(new) = self.string_id(s) {
                    *s = new.to_string();
                } else if self.has_urls() {
                    *s = self.replace_urls(s);
                }
            }
        }
    }

    fn string_id(&self, s: &str) -> Option<i64> {
        let trimmed = s.trim();
        if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        trimmed.parse::<i64>().ok().and_then(|old| self.id(old))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MapKey;

    fn maps() -> ReferenceMaps {
        let mut m = ReferenceMaps::new();
        m.insert_id(42, 99);
        m.insert_url(
            "https://a.test/uploads/hero.jpg",
            "https://b.test/uploads/sites/2/hero.jpg",
        );
        m.insert_url(
            "https://a.test/uploads/hero-150x150.jpg",
            "https://b.test/uploads/sites/2/hero-150x150.jpg",
        );
        m
    }

    fn sample() -> Value {
        Value::Map(vec![
            ("photo".into(), Value::Int(42)),
            ("photo_src".into(), Value::from("https://a.test/uploads/hero.jpg")),
            (
                "gallery".into(),
                Value::Seq(vec![Value::from(" 42 "), Value::Float(42.7), Value::Int(7)]),
            ),
            (
                MapKey::Int(42),
                Value::Object {
                    class: "stdClass".to_string(),
                    fields: vec![(
                        "html".into(),
                        Value::from(
                            "<img src=\"https://a.test/uploads/hero-150x150.jpg\"> and hero.jpg",
                        ),
                    )],
                },
            ),
            ("flag".into(), Value::Bool(true)),
        ])
    }

    #[test]
    fn test_empty_maps_leave_value_unchanged() {
        let v = sample();
        assert_eq!(ReferenceMaps::new().rewrite(&v), v);
    }

    #[test]
    fn test_rewrites_ids_urls_and_nested_objects() {
        let out = maps().rewrite(&sample());
        assert_eq!(out.get("photo"), Some(&Value::Int(99)));
        assert_eq!(
            out.get("photo_src"),
            Some(&Value::from("https://b.test/uploads/sites/2/hero.jpg"))
        );
        assert_eq!(
            out.get("gallery"),
            Some(&Value::Seq(vec![
                Value::from("99"),
                Value::Int(99),
                Value::Int(7)
            ]))
        );
        // Keys are never rewritten, only values.
        let nested = out.get("42").unwrap();
        assert_eq!(
            nested.get("html"),
            Some(&Value::from(
                "<img src=\"https://b.test/uploads/sites/2/hero-150x150.jpg\"> and hero.jpg"
            ))
        );
        assert_eq!(out.get("flag"), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_unmapped_digit_string_falls_through_to_url_substitution() {
        let out = maps().rewrite(&Value::from("7"));
        assert_eq!(out, Value::from("7"));
    }

    #[test]
    fn test_insert_url_replaces_in_place() {
        let mut m = ReferenceMaps::new();
        m.insert_url("a", "b");
        m.insert_url("c", "d");
        m.insert_url("a", "z");
        assert_eq!(
            m.urls(),
            &[
                ("a".to_string(), "z".to_string()),
                ("c".to_string(), "d".to_string())
            ]
        );
        assert_eq!(m.url("a"), Some("z"));
    }

    #[test]
    fn test_replace_urls_applies_every_pair() {
        let m = maps();
        let body = "<img src=\"https://a.test/uploads/hero.jpg\"><img src=\"https://a.test/uploads/hero-150x150.jpg\">";
        assert_eq!(
            m.replace_urls(body),
            "<img src=\"https://b.test/uploads/sites/2/hero.jpg\"><img src=\"https://b.test/uploads/sites/2/hero-150x150.jpg\">"
        );
    }
}
