//! Page-builder layout cloning.
//!
//! A layout graph maps node id to node. Each node carries its own id in the
//! `node` field and, unless it is a root, the id of its parent in
//! `parent`. Node ids are global to the installation, so a cloned layout
//! gets fresh ids throughout while keeping its shape.

use std::collections::{BTreeMap, BTreeSet};

use sitecopy_storage::{ItemId, LayoutVariant, PageBuilder, StoreError};
use sitecopy_value::{MapKey, ReferenceMaps, Value};
use tracing::{debug, warn};

use crate::error::CloneError;

const NODE_FIELD: &str = "node";
const PARENT_FIELD: &str = "parent";
const TEMPLATE_ID_FIELD: &str = "template_id";
const TEMPLATE_NODE_ID_FIELD: &str = "template_node_id";

/// Layout state of the source item, read before the tenant switch.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutSnapshot {
    pub published: Value,
    pub draft: Value,
    pub published_settings: Option<Value>,
    pub draft_settings: Option<Value>,
    /// The source item is a global node template.
    pub global_template: bool,
}

impl LayoutSnapshot {
    pub fn capture<B: PageBuilder + ?Sized>(builder: &B, item: ItemId) -> Result<Self, StoreError> {
        Ok(Self {
            published: builder.layout_data(LayoutVariant::Published, item)?,
            draft: builder.layout_data(LayoutVariant::Draft, item)?,
            published_settings: builder.layout_settings(LayoutVariant::Published, item)?,
            draft_settings: builder.layout_settings(LayoutVariant::Draft, item)?,
            global_template: builder.is_global_template(item)?,
        })
    }

    /// True when the source has no layout at all.
    pub fn is_empty(&self) -> bool {
        self.published.is_empty()
            && self.draft.is_empty()
            && self.published_settings.is_none()
            && self.draft_settings.is_none()
    }
}

/// Summary of a layout clone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayoutOutcome {
    pub published_nodes: usize,
    pub draft_nodes: usize,
    /// Nodes whose parent could not be resolved and became roots.
    pub promoted_to_root: usize,
    pub template_stamped: bool,
}

/// Old node id to new node id, plus the set of ids already issued.
#[derive(Default)]
struct NodeIds {
    map: BTreeMap<String, String>,
    issued: BTreeSet<String>,
}

impl NodeIds {
    fn assign(&mut self, old: String, new: String) {
        self.issued.insert(new.clone());
        self.map.insert(old, new);
    }

    fn get(&self, old: &str) -> Option<&str> {
        self.map.get(old).map(String::as_str)
    }

    /// Resolve a parent reference: a known old id maps to its new id, an
    /// id issued during this clone is already new.
    fn resolve(&self, parent: &str) -> Option<String> {
        if let Some(new) = self.get(parent) {
            return Some(new.to_string());
        }
        self.issued.contains(parent).then(|| parent.to_string())
    }
}

/// Regenerates the page-builder layout on the destination item.
pub struct LayoutCloner<'a> {
    builder: &'a dyn PageBuilder,
}

impl<'a> LayoutCloner<'a> {
    pub fn new(builder: &'a dyn PageBuilder) -> Self {
        Self { builder }
    }

    /// Clone `snapshot` onto `new_item` in the current tenant.
    ///
    /// Attachment references are rewritten with `maps`, every node gets a
    /// fresh id and parents follow. An empty draft becomes a copy of the
    /// cloned published graph. A parent that resolves to neither a mapped
    /// nor a newly issued id is dropped, promoting the node to root.
    pub fn clone_layout(
        &self,
        snapshot: LayoutSnapshot,
        maps: &ReferenceMaps,
        new_item: ItemId,
        source_item: ItemId,
    ) -> Result<LayoutOutcome, CloneError> {
        let LayoutSnapshot {
            mut published,
            mut draft,
            mut published_settings,
            mut draft_settings,
            global_template,
        } = snapshot;

        maps.rewrite_in_place(&mut published);
        maps.rewrite_in_place(&mut draft);
        if let Some(settings) = published_settings.as_mut() {
            maps.rewrite_in_place(settings);
        }
        if let Some(settings) = draft_settings.as_mut() {
            maps.rewrite_in_place(settings);
        }

        let mut outcome = LayoutOutcome::default();
        let mut ids = NodeIds::default();

        if let Some(nodes) = published.entries() {
            for (key, _) in nodes {
                ids.assign(key.to_string(), self.builder.generate_node_id());
            }
        }
        outcome.published_nodes = ids.map.len();
        outcome.promoted_to_root += renumber(&mut published, &ids, LayoutVariant::Published);

        if draft.is_empty() {
            draft = published.clone();
            outcome.draft_nodes = outcome.published_nodes;
        } else {
            if let Some(nodes) = draft.entries() {
                let draft_only: Vec<String> = nodes
                    .iter()
                    .map(|(key, _)| key.to_string())
                    .filter(|old| ids.get(old).is_none())
                    .collect();
                for old in draft_only {
                    ids.assign(old, self.builder.generate_node_id());
                }
                outcome.draft_nodes = nodes.len();
            }
            outcome.promoted_to_root += renumber(&mut draft, &ids, LayoutVariant::Draft);
        }

        let layout_error = |source| CloneError::Layout {
            item_id: new_item,
            source,
        };

        if global_template {
            if let Some(template_id) = self.builder.template_id(new_item).map_err(layout_error)? {
                stamp_template(&mut published, &template_id);
                stamp_template(&mut draft, &template_id);
                outcome.template_stamped = true;
            }
        }

        self.builder
            .flush_asset_cache(source_item)
            .map_err(layout_error)?;
        self.builder
            .set_layout_data(LayoutVariant::Published, new_item, &published)
            .map_err(layout_error)?;
        self.builder
            .set_layout_data(LayoutVariant::Draft, new_item, &draft)
            .map_err(layout_error)?;
        if let Some(settings) = &published_settings {
            self.builder
                .set_layout_settings(LayoutVariant::Published, new_item, settings)
                .map_err(layout_error)?;
        }
        if let Some(settings) = &draft_settings {
            self.builder
                .set_layout_settings(LayoutVariant::Draft, new_item, settings)
                .map_err(layout_error)?;
        }

        debug!(
            item = new_item,
            published = outcome.published_nodes,
            draft = outcome.draft_nodes,
            stamped = outcome.template_stamped,
            "cloned layout"
        );
        Ok(outcome)
    }
}

/// Rewrite node keys, `node` fields and parents of `graph` through `ids`.
/// Returns the number of nodes promoted to root.
fn renumber(graph: &mut Value, ids: &NodeIds, variant: LayoutVariant) -> usize {
    let Some(nodes) = graph.entries_mut() else {
        if !graph.is_empty() {
            warn!(%variant, kind = graph.type_name(), "layout graph is not a mapping, node ids kept");
        }
        return 0;
    };

    let mut promoted = 0;
    for (key, node) in nodes.iter_mut() {
        let old = key.to_string();
        let Some(new) = ids.get(&old) else {
            continue;
        };
        *key = MapKey::Str(new.to_string());
        node.set(NODE_FIELD, Value::Str(new.to_string()));

        let Some(parent) = node.get(PARENT_FIELD).and_then(node_ref) else {
            continue;
        };
        match ids.resolve(&parent) {
            Some(resolved) => {
                node.set(PARENT_FIELD, Value::Str(resolved));
            }
            None => {
                warn!(%variant, node = %new, parent = %parent, "unresolved layout parent, promoting node to root");
                node.set(PARENT_FIELD, Value::Null);
                promoted += 1;
            }
        }
    }
    promoted
}

fn stamp_template(graph: &mut Value, template_id: &str) {
    let Some(nodes) = graph.entries_mut() else {
        return;
    };
    for (key, node) in nodes.iter_mut() {
        node.set(TEMPLATE_ID_FIELD, Value::Str(template_id.to_string()));
        node.set(TEMPLATE_NODE_ID_FIELD, Value::Str(key.to_string()));
    }
}

/// A node reference as a string id. Null and empty mean "no parent".
fn node_ref(value: &Value) -> Option<String> {
    match value {
        Value::Str(s) if !s.is_empty() => Some(s.clone()),
        Value::Int(i) => Some(i.to_string()),
        _ => None,
    }
}
