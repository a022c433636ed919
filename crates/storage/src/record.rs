use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub type TenantId = i64;
pub type ItemId = i64;

/// Well-known content item field names.
pub mod fields {
    pub const TITLE: &str = "post_title";
    pub const CONTENT: &str = "post_content";
    pub const STATUS: &str = "post_status";
    pub const TYPE: &str = "post_type";
    pub const NAME: &str = "post_name";
    pub const PARENT: &str = "post_parent";
    pub const MENU_ORDER: &str = "menu_order";
    pub const MIME_TYPE: &str = "post_mime_type";
    pub const GUID: &str = "guid";
}

/// A site of the installation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    pub id: TenantId,
    pub name: String,
    pub home_url: String,
}

/// One content record. `id` is `None` for an item not yet inserted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: Option<ItemId>,
    pub fields: BTreeMap<String, String>,
}

impl ContentItem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field setter.
    pub fn with_field(mut self, name: &str, value: impl Into<String>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn set_field(&mut self, name: &str, value: impl Into<String>) {
        self.fields.insert(name.to_string(), value.into());
    }

    pub fn content(&self) -> &str {
        self.field(fields::CONTENT).unwrap_or("")
    }

    pub fn post_type(&self) -> &str {
        self.field(fields::TYPE).unwrap_or("post")
    }
}

/// Metadata of one item: each key maps to an ordered list of raw values.
///
/// Keys are kept in first-insertion order and may carry several values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaMap {
    entries: Vec<(String, Vec<String>)>,
}

impl MetaMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value under `key`.
    pub fn push(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some((_, values)) => values.push(value),
            None => self.entries.push((key.to_string(), vec![value])),
        }
    }

    /// Replace every value under `key` with a single one.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some((_, values)) => *values = vec![value],
            None => self.entries.push((key.to_string(), vec![value])),
        }
    }

    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_slice())
    }

    pub fn first(&self, key: &str) -> Option<&str> {
        self.get(key)?.first().map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Every key with its values, in key order.
    pub fn groups(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Every (key, value) pair, flattened in key then value order.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .flat_map(|(k, values)| values.iter().map(move |v| (k.as_str(), v.as_str())))
    }

    /// Total number of values across all keys.
    pub fn len(&self) -> usize {
        self.entries.iter().map(|(_, v)| v.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Upload location of the current tenant: filesystem directory and the
/// public URL it is served under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadDir {
    pub path: PathBuf,
    pub url: String,
}

/// A derived, resized copy of an image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rendition {
    pub file: String,
    pub width: u32,
    pub height: u32,
    pub mime_type: String,
}

/// Attachment metadata: the original file plus its named renditions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenditionMeta {
    pub file: String,
    pub width: u32,
    pub height: u32,
    pub sizes: BTreeMap<String, Rendition>,
}

/// An attachment as listed under its parent item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentRecord {
    pub id: ItemId,
    pub parent: ItemId,
    pub menu_order: i64,
    pub mime_type: String,
    pub title: String,
}

/// Fields for registering a new attachment record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAttachment {
    pub guid: String,
    pub mime_type: String,
    pub title: String,
    pub content: String,
    pub status: String,
}

/// The two stored variants of a page-builder layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayoutVariant {
    Published,
    Draft,
}

impl LayoutVariant {
    pub const ALL: [LayoutVariant; 2] = [LayoutVariant::Published, LayoutVariant::Draft];

    /// Metadata key holding the node graph.
    pub fn data_key(self) -> &'static str {
        match self {
            LayoutVariant::Published => "_fl_builder_data",
            LayoutVariant::Draft => "_fl_builder_draft",
        }
    }

    /// Metadata key holding the layout settings blob.
    pub fn settings_key(self) -> &'static str {
        match self {
            LayoutVariant::Published => "_fl_builder_data_settings",
            LayoutVariant::Draft => "_fl_builder_draft_settings",
        }
    }
}

impl fmt::Display for LayoutVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutVariant::Published => f.write_str("published"),
            LayoutVariant::Draft => f.write_str("draft"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meta_map_keeps_duplicate_values_in_order() {
        let mut m = MetaMap::new();
        m.push("color", "red");
        m.push("size", "L");
        m.push("color", "blue");
        assert_eq!(m.get("color").unwrap(), &["red".to_string(), "blue".to_string()]);
        assert_eq!(
            m.pairs().collect::<Vec<_>>(),
            vec![("color", "red"), ("color", "blue"), ("size", "L")]
        );
        assert_eq!(m.len(), 3);
    }

    #[test]
    fn test_meta_map_set_replaces_all_values() {
        let mut m = MetaMap::new();
        m.push("k", "1");
        m.push("k", "2");
        m.set("k", "3");
        assert_eq!(m.first("k"), Some("3"));
        assert_eq!(m.len(), 1);
    }

    #[test]
    fn test_content_item_defaults() {
        let item = ContentItem::new().with_field(fields::TITLE, "Hello");
        assert_eq!(item.content(), "");
        assert_eq!(item.post_type(), "post");
        assert_eq!(item.field(fields::TITLE), Some("Hello"));
    }
}
