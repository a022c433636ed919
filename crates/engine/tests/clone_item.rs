//! End-to-end clone tests against the in-memory installation.
//!
//! Site 1 ("Main") and site 2 ("Shop") share the host `example.test`; the
//! shop lives under `/shop`. Uploads go to a temporary directory.

use std::path::Path;

use sitecopy_engine::{CloneError, Cloner};
use sitecopy_storage::memory::Faults;
use sitecopy_storage::{
    fields, keys, AttachmentStore, ContentItem, ContentStore, ItemId, LayoutVariant,
    MemoryInstallation, MetadataStore, PageBuilder, StoreError, TaxonomyStore, TenantContext,
};
use sitecopy_value::{MapKey, Value};
use tempfile::TempDir;

// ──────────────────────────────────────────────
// Helpers
// ──────────────────────────────────────────────

fn installation(root: &Path, shop_home: &str) -> MemoryInstallation {
    MemoryInstallation::new(root.join("uploads"))
        .with_site(1, "Main", "https://example.test")
        .with_site(2, "Shop", shop_home)
}

fn full_cloner(inst: &MemoryInstallation) -> Cloner<'_, MemoryInstallation> {
    Cloner::new(inst).with_media(inst).with_builder(inst)
}

fn source_item(inst: &MemoryInstallation) -> ItemId {
    let id = inst
        .insert_item(
            &ContentItem::new()
                .with_field(fields::TITLE, "Hello world")
                .with_field(fields::CONTENT, "<p>Plain body</p>")
                .with_field(fields::STATUS, "publish")
                .with_field(fields::TYPE, "page")
                .with_field(fields::NAME, "hello-world"),
        )
        .unwrap();
    inst.set_term_slugs(id, "category", &["news".to_string(), "events".to_string()])
        .unwrap();
    inst.add_meta(id, "color", "red").unwrap();
    inst.add_meta(id, keys::OLD_SLUG, "hello-old").unwrap();
    inst.add_meta(id, "color", "blue").unwrap();
    inst.add_meta(id, "options", "a:1:{s:4:\"mode\";s:4:\"dark\";}")
        .unwrap();
    id
}

/// Upload a small image into site 1 as an attachment of `parent`.
fn attach_photo(inst: &MemoryInstallation, root: &Path, parent: ItemId) -> ItemId {
    let photo = root.join("photo.jpg");
    std::fs::write(&photo, b"jpeg bytes").unwrap();
    inst.upload_attachment(parent, &photo, "Photo", Some("A photo"), 0)
        .unwrap()
}

/// Pad site 2 with items so destination ids differ from source ids.
fn pad_destination(inst: &MemoryInstallation, count: usize) {
    inst.within(2, |s| {
        for _ in 0..count {
            s.insert_item(&ContentItem::new())?;
        }
        Ok(())
    })
    .unwrap();
}

fn node(id: &str, parent: Option<&str>, extra: Vec<(&str, Value)>) -> Value {
    let mut fields = vec![
        (MapKey::from("node"), Value::from(id)),
        (
            MapKey::from("parent"),
            parent.map(Value::from).unwrap_or(Value::Null),
        ),
    ];
    fields.extend(extra.into_iter().map(|(k, v)| (MapKey::from(k), v)));
    Value::Object {
        class: "stdClass".to_string(),
        fields,
    }
}

fn layout_with_photo(photo_id: ItemId) -> Value {
    Value::Map(vec![
        (MapKey::from("r1"), node("r1", None, vec![])),
        (MapKey::from("c1"), node("c1", Some("r1"), vec![])),
        (
            MapKey::from("p1"),
            node(
                "p1",
                Some("c1"),
                vec![
                    ("photo", Value::Int(photo_id)),
                    (
                        "photo_src",
                        Value::from("https://example.test/wp-content/uploads/photo.jpg"),
                    ),
                ],
            ),
        ),
    ])
}

// ──────────────────────────────────────────────
// Plain items
// ──────────────────────────────────────────────

#[test]
fn test_plain_item_is_copied_field_for_field() {
    let root = TempDir::new().unwrap();
    let inst = installation(root.path(), "https://example.test/shop");
    let source = source_item(&inst);

    let outcome = full_cloner(&inst).clone_item(source, 2).unwrap();
    assert_eq!(outcome.attachments_migrated, 0);
    assert!(!outcome.layout_cloned);
    assert_eq!(outcome.meta_written, 3);

    let original = inst.get_item(source).unwrap();
    let items = inst.items_of(2).unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, Some(outcome.new_id));
    assert_eq!(items[0].fields, original.fields);

    inst.within(2, |s| {
        assert_eq!(
            s.term_slugs(outcome.new_id, "category")?,
            vec!["news".to_string(), "events".to_string()]
        );
        let meta = s.all_meta(outcome.new_id)?;
        assert_eq!(
            meta.get("color").unwrap(),
            &["red".to_string(), "blue".to_string()]
        );
        assert_eq!(
            meta.first("options"),
            Some("a:1:{s:4:\"mode\";s:4:\"dark\";}")
        );
        Ok(())
    })
    .unwrap();
}

#[test]
fn test_old_slug_is_never_copied() {
    let root = TempDir::new().unwrap();
    let inst = installation(root.path(), "https://example.test/shop");
    let source = source_item(&inst);
    inst.add_meta(source, keys::OLD_SLUG, "even-older").unwrap();

    let outcome = Cloner::new(&inst).clone_item(source, 2).unwrap();
    let meta = inst.within(2, |s| s.all_meta(outcome.new_id)).unwrap();
    assert!(!meta.contains_key(keys::OLD_SLUG));
}

#[test]
fn test_context_is_restored_after_success() {
    let root = TempDir::new().unwrap();
    let inst = installation(root.path(), "https://example.test/shop");
    let source = source_item(&inst);

    full_cloner(&inst).clone_item(source, 2).unwrap();
    assert_eq!(inst.current_tenant(), 1);
    assert!(matches!(inst.pop_tenant(), Err(StoreError::NoTenantToRestore)));
}

#[test]
fn test_cloning_twice_creates_two_copies() {
    let root = TempDir::new().unwrap();
    let inst = installation(root.path(), "https://example.test/shop");
    let source = source_item(&inst);

    let first = Cloner::new(&inst).clone_item(source, 2).unwrap();
    let second = Cloner::new(&inst).clone_item(source, 2).unwrap();
    assert_ne!(first.new_id, second.new_id);
    assert_eq!(inst.items_of(2).unwrap().len(), 2);
}

// ──────────────────────────────────────────────
// Failure paths
// ──────────────────────────────────────────────

#[test]
fn test_rejected_insert_aborts_without_side_effects() {
    let root = TempDir::new().unwrap();
    let inst = installation(root.path(), "https://example.test/shop");
    let source = source_item(&inst);
    let photo = attach_photo(&inst, root.path(), source);
    inst.add_meta(source, keys::THUMBNAIL_ID, &photo.to_string())
        .unwrap();
    inst.set_layout_data(LayoutVariant::Published, source, &layout_with_photo(photo))
        .unwrap();
    inst.set_faults(Faults {
        reject_inserts: true,
        ..Faults::default()
    })
    .unwrap();
    let before = inst.journal().unwrap();

    let result = full_cloner(&inst).clone_item(source, 2);
    assert!(matches!(result, Err(CloneError::Insert { tenant_id: 2, .. })));

    let after = inst.journal().unwrap();
    assert_eq!(after.attachments_created, before.attachments_created);
    assert_eq!(after.meta_writes, before.meta_writes);
    assert_eq!(after.layout_writes, before.layout_writes);
    assert_eq!(after.cache_flushes, before.cache_flushes);
    assert_eq!(inst.current_tenant(), 1);
    assert!(matches!(inst.pop_tenant(), Err(StoreError::NoTenantToRestore)));
    assert!(inst.items_of(2).unwrap().is_empty());
}

#[test]
fn test_missing_source_is_reported_without_switching() {
    let root = TempDir::new().unwrap();
    let inst = installation(root.path(), "https://example.test/shop");

    let result = full_cloner(&inst).clone_item(404, 2);
    assert!(matches!(
        result,
        Err(CloneError::SourceNotFound {
            tenant_id: 1,
            item_id: 404,
            ..
        })
    ));
    assert_eq!(inst.current_tenant(), 1);
}

#[test]
fn test_unknown_destination_is_a_switch_error() {
    let root = TempDir::new().unwrap();
    let inst = installation(root.path(), "https://example.test/shop");
    let source = source_item(&inst);

    let result = full_cloner(&inst).clone_item(source, 9);
    assert!(matches!(result, Err(CloneError::Switch { tenant_id: 9, .. })));
    assert_eq!(inst.current_tenant(), 1);
}

// ──────────────────────────────────────────────
// Media
// ──────────────────────────────────────────────

#[test]
fn test_attachments_are_migrated_and_references_rewritten() {
    let root = TempDir::new().unwrap();
    let inst = installation(root.path(), "https://example.test/shop");
    pad_destination(&inst, 5);
    let source = source_item(&inst);
    let photo = attach_photo(&inst, root.path(), source);
    let body = "<img src=\"https://example.test/wp-content/uploads/photo.jpg\">\
                <img src=\"https://example.test/wp-content/uploads/photo-150x150.jpg\">";
    inst.update_item_fields(
        source,
        &[(fields::CONTENT.to_string(), body.to_string())]
            .into_iter()
            .collect(),
    )
    .unwrap();
    inst.add_meta(source, keys::THUMBNAIL_ID, &photo.to_string())
        .unwrap();
    inst.add_meta(
        source,
        "gallery",
        &format!("a:1:{{i:0;i:{};}}", photo),
    )
    .unwrap();

    let outcome = full_cloner(&inst).clone_item(source, 2).unwrap();
    assert_eq!(outcome.attachments_migrated, 1);

    inst.within(2, |s| {
        let attached = s.image_attachments(outcome.new_id)?;
        assert_eq!(attached.len(), 1);
        let new_photo = attached[0].id;
        assert_ne!(new_photo, photo);

        let item = s.get_item(outcome.new_id)?;
        assert_eq!(
            item.content(),
            "<img src=\"https://example.test/shop/wp-content/uploads/sites/2/photo.jpg\">\
             <img src=\"https://example.test/shop/wp-content/uploads/sites/2/photo-150x150.jpg\">"
        );

        let meta = s.all_meta(outcome.new_id)?;
        assert_eq!(meta.first(keys::THUMBNAIL_ID), Some(new_photo.to_string().as_str()));
        assert_eq!(
            meta.first("gallery"),
            Some(format!("a:1:{{i:0;i:{};}}", new_photo).as_str())
        );
        assert_eq!(s.alt_text(new_photo)?.as_deref(), Some("A photo"));
        Ok(())
    })
    .unwrap();
}

#[test]
fn test_cross_domain_destination_keeps_source_urls() {
    let root = TempDir::new().unwrap();
    let inst = installation(root.path(), "https://shop.other.test");
    let source = source_item(&inst);
    let photo = attach_photo(&inst, root.path(), source);
    inst.add_meta(source, keys::THUMBNAIL_ID, &photo.to_string())
        .unwrap();
    let before = inst.journal().unwrap().attachments_created;

    let outcome = full_cloner(&inst).clone_item(source, 2).unwrap();
    assert_eq!(outcome.attachments_migrated, 0);
    assert_eq!(inst.journal().unwrap().attachments_created, before);

    let meta = inst.within(2, |s| s.all_meta(outcome.new_id)).unwrap();
    assert_eq!(meta.first(keys::THUMBNAIL_ID), Some(photo.to_string().as_str()));
}

#[test]
fn test_attachment_with_deleted_file_keeps_source_references() {
    let root = TempDir::new().unwrap();
    let inst = installation(root.path(), "https://example.test/shop");
    let source = source_item(&inst);
    let photo = attach_photo(&inst, root.path(), source);
    std::fs::remove_file(root.path().join("uploads").join("photo.jpg")).unwrap();
    let body = "<img src=\"https://example.test/wp-content/uploads/photo.jpg\">";
    inst.update_item_fields(
        source,
        &[(fields::CONTENT.to_string(), body.to_string())]
            .into_iter()
            .collect(),
    )
    .unwrap();
    inst.add_meta(source, keys::THUMBNAIL_ID, &photo.to_string())
        .unwrap();
    let before = inst.journal().unwrap().attachments_created;

    let outcome = full_cloner(&inst).clone_item(source, 2).unwrap();
    assert_eq!(outcome.attachments_migrated, 0);
    assert_eq!(inst.journal().unwrap().attachments_created, before);
    assert!(!root.path().join("uploads/sites/2/photo.jpg").exists());

    inst.within(2, |s| {
        assert_eq!(s.get_item(outcome.new_id)?.content(), body);
        assert!(s.image_attachments(outcome.new_id)?.is_empty());
        let meta = s.all_meta(outcome.new_id)?;
        assert_eq!(meta.first(keys::THUMBNAIL_ID), Some(photo.to_string().as_str()));
        Ok(())
    })
    .unwrap();
}

#[test]
fn test_media_is_ignored_without_the_capability() {
    let root = TempDir::new().unwrap();
    let inst = installation(root.path(), "https://example.test/shop");
    let source = source_item(&inst);
    attach_photo(&inst, root.path(), source);
    let before = inst.journal().unwrap().attachments_created;

    let outcome = Cloner::new(&inst).clone_item(source, 2).unwrap();
    assert_eq!(outcome.attachments_migrated, 0);
    assert_eq!(inst.journal().unwrap().attachments_created, before);
}

// ──────────────────────────────────────────────
// Page builder
// ──────────────────────────────────────────────

#[test]
fn test_layout_is_regenerated_not_copied() {
    let root = TempDir::new().unwrap();
    let inst = installation(root.path(), "https://example.test/shop");
    pad_destination(&inst, 5);
    let source = source_item(&inst);
    let photo = attach_photo(&inst, root.path(), source);
    inst.set_layout_data(LayoutVariant::Published, source, &layout_with_photo(photo))
        .unwrap();
    inst.set_layout_settings(
        LayoutVariant::Published,
        source,
        &Value::Map(vec![(MapKey::from("css"), Value::from(".fl-row { }"))]),
    )
    .unwrap();

    let outcome = full_cloner(&inst).clone_item(source, 2).unwrap();
    assert!(outcome.layout_cloned);
    assert_eq!(outcome.meta_suppressed, 2);
    assert_eq!(inst.journal().unwrap().cache_flushes, vec![(2, source)]);

    inst.within(2, |s| {
        let new_photo = s.image_attachments(outcome.new_id)?[0].id;
        let published = s.layout_data(LayoutVariant::Published, outcome.new_id)?;
        let draft = s.layout_data(LayoutVariant::Draft, outcome.new_id)?;
        assert_eq!(draft, published);

        let nodes = published.entries().unwrap();
        assert_eq!(nodes.len(), 3);
        assert!(nodes.iter().all(|(k, _)| !["r1", "c1", "p1"].contains(&k.to_string().as_str())));
        let (_, photo_node) = &nodes[2];
        assert_eq!(photo_node.get("photo"), Some(&Value::Int(new_photo)));
        assert_eq!(
            photo_node.get("photo_src").and_then(Value::as_str),
            Some("https://example.test/shop/wp-content/uploads/sites/2/photo.jpg")
        );

        let meta = s.all_meta(outcome.new_id)?;
        assert_eq!(meta.get(LayoutVariant::Published.data_key()).unwrap().len(), 1);
        assert!(s
            .layout_settings(LayoutVariant::Published, outcome.new_id)?
            .is_some());
        Ok(())
    })
    .unwrap();
}

#[test]
fn test_builder_keys_copy_verbatim_without_builder() {
    let root = TempDir::new().unwrap();
    let inst = installation(root.path(), "https://example.test/shop");
    let source = source_item(&inst);
    inst.set_layout_data(LayoutVariant::Published, source, &layout_with_photo(1))
        .unwrap();
    let raw = inst
        .get_meta(source, LayoutVariant::Published.data_key())
        .unwrap()
        .unwrap();

    let outcome = Cloner::new(&inst).clone_item(source, 2).unwrap();
    assert!(!outcome.layout_cloned);
    let copied = inst
        .within(2, |s| s.get_meta(outcome.new_id, LayoutVariant::Published.data_key()))
        .unwrap();
    assert_eq!(copied, Some(raw));
}

#[test]
fn test_global_template_clone_is_stamped_with_fresh_binding() {
    let root = TempDir::new().unwrap();
    let inst = installation(root.path(), "https://example.test/shop");
    let source = source_item(&inst);
    inst.set_layout_data(LayoutVariant::Published, source, &layout_with_photo(1))
        .unwrap();
    inst.add_meta(source, keys::BUILDER_TEMPLATE_ID, "5f2a9c0d1b3e4")
        .unwrap();
    inst.add_meta(source, keys::BUILDER_TEMPLATE_GLOBAL, "1")
        .unwrap();

    let outcome = full_cloner(&inst).clone_item(source, 2).unwrap();
    inst.within(2, |s| {
        let binding = s.template_id(outcome.new_id)?.unwrap();
        assert_ne!(binding, "5f2a9c0d1b3e4");
        assert_eq!(binding.len(), 13);

        let published = s.layout_data(LayoutVariant::Published, outcome.new_id)?;
        for (key, node) in published.entries().unwrap() {
            assert_eq!(
                node.get("template_id").and_then(Value::as_str),
                Some(binding.as_str())
            );
            assert_eq!(
                node.get("template_node_id").and_then(Value::as_str),
                Some(key.to_string().as_str())
            );
        }
        Ok(())
    })
    .unwrap();
}
