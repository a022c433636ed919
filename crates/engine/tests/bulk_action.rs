//! Bulk clone through the admin action handler.

use std::path::Path;

use sitecopy_engine::{
    bulk_action_entries, BulkActionHandler, BulkNotice, Cloner, NoticeToken, Settings,
};
use sitecopy_storage::{fields, ContentItem, ContentStore, ItemId, MemoryInstallation, SiteDirectory};
use tempfile::TempDir;

fn installation(root: &Path) -> MemoryInstallation {
    MemoryInstallation::new(root.join("uploads"))
        .with_site(1, "Main", "https://example.test")
        .with_site(2, "Shop", "https://example.test/shop")
        .with_site(3, "Blog", "https://example.test/blog")
}

fn settings() -> Settings {
    Settings {
        nonce_secret: "bulk-secret".to_string(),
        ..Settings::default()
    }
}

fn post(inst: &MemoryInstallation, title: &str) -> ItemId {
    inst.insert_item(
        &ContentItem::new()
            .with_field(fields::TITLE, title)
            .with_field(fields::STATUS, "publish"),
    )
    .unwrap()
}

const LIST_URL: &str = "https://example.test/wp-admin/edit.php?post_type=post&paged=2";

#[test]
fn test_clone_action_copies_every_selected_item() {
    let root = TempDir::new().unwrap();
    let inst = installation(root.path());
    let ids = [post(&inst, "One"), post(&inst, "Two")];
    let settings = settings();

    let report = BulkActionHandler::new(Cloner::new(&inst), &settings).run(LIST_URL, "clone_to_3", &ids);
    assert_eq!(report.destination, Some(3));
    assert_eq!(report.cloned.len(), 2);
    assert!(report.failed.is_empty());

    let titles: Vec<String> = inst
        .items_of(3)
        .unwrap()
        .iter()
        .filter_map(|item| item.field(fields::TITLE).map(str::to_string))
        .collect();
    assert_eq!(titles, vec!["One".to_string(), "Two".to_string()]);
    assert!(inst.items_of(2).unwrap().is_empty());

    assert!(report.redirect.starts_with(
        "https://example.test/wp-admin/edit.php?post_type=post&paged=2&mpcl_posts_moved=2&mpcl_blogid=3&mpcl_nonce="
    ));
    let notice = BulkNotice::from_url(&report.redirect, &NoticeToken::new("bulk-secret")).unwrap();
    assert_eq!(notice.count, 2);
    assert_eq!(notice.tenant, 3);
    assert_eq!(notice.message("Blog"), "2 posts have been cloned into \"Blog\".");
}

#[test]
fn test_failed_item_does_not_stop_the_batch() {
    let root = TempDir::new().unwrap();
    let inst = installation(root.path());
    let first = post(&inst, "One");
    let last = post(&inst, "Two");
    let settings = settings();

    let report =
        BulkActionHandler::new(Cloner::new(&inst), &settings).run(LIST_URL, "clone_to_2", &[first, 404, last]);
    assert_eq!(report.cloned.len(), 2);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, 404);
    assert_eq!(inst.items_of(2).unwrap().len(), 2);
    // The count reports the selection, not the successes.
    assert!(report.redirect.contains("mpcl_posts_moved=3"));
}

#[test]
fn test_other_actions_only_strip_stale_arguments() {
    let root = TempDir::new().unwrap();
    let inst = installation(root.path());
    let id = post(&inst, "One");
    let settings = settings();
    let handler = BulkActionHandler::new(Cloner::new(&inst), &settings);

    let stale = "edit.php?mpcl_posts_moved=4&mpcl_blogid=2&post_status=draft";
    assert_eq!(handler.handle(stale, "trash", &[id]), "edit.php?post_status=draft");
    assert_eq!(handler.handle(stale, "clone_to_", &[id]), "edit.php?post_status=draft");
    assert_eq!(handler.handle(stale, "clone_to_shop", &[id]), "edit.php?post_status=draft");
    assert!(inst.items_of(2).unwrap().is_empty());
}

#[test]
fn test_unknown_destination_fails_each_item() {
    let root = TempDir::new().unwrap();
    let inst = installation(root.path());
    let id = post(&inst, "One");
    let settings = settings();

    let report = BulkActionHandler::new(Cloner::new(&inst), &settings).run("edit.php", "clone_to_9", &[id]);
    assert!(report.cloned.is_empty());
    assert_eq!(report.failed.len(), 1);
    assert!(report.redirect.starts_with("edit.php?mpcl_posts_moved=1&mpcl_blogid=9&mpcl_nonce="));
}

#[test]
fn test_menu_lists_other_sites() {
    let root = TempDir::new().unwrap();
    let inst = installation(root.path());
    let entries = bulk_action_entries(&inst.sites().unwrap(), 2, &settings());
    assert_eq!(
        entries,
        vec![
            ("clone_to_1".to_string(), "Clone to \"Main\"".to_string()),
            ("clone_to_3".to_string(), "Clone to \"Blog\"".to_string()),
        ]
    );
}
