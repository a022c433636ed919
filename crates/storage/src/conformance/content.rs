use std::collections::BTreeMap;

use super::{expect_eq, make_item, Backend, TestResult};
use crate::record::fields;
use crate::StoreError;

pub(super) fn run_content_tests<S, F>(factory: &F) -> Vec<TestResult>
where
    S: Backend,
    F: Fn() -> S,
{
    vec![
        TestResult::from_result(
            "content",
            "insert_then_get_returns_fields",
            insert_then_get_returns_fields(factory),
        ),
        TestResult::from_result(
            "content",
            "insert_ignores_supplied_id",
            insert_ignores_supplied_id(factory),
        ),
        TestResult::from_result(
            "content",
            "update_changes_only_given_fields",
            update_changes_only_given_fields(factory),
        ),
        TestResult::from_result(
            "content",
            "missing_item_is_not_found",
            missing_item_is_not_found(factory),
        ),
        TestResult::from_result(
            "content",
            "term_assignment_replaces",
            term_assignment_replaces(factory),
        ),
    ]
}

// ── Test implementations ─────────────────────────────────────────────────────

/// Every field given to insert comes back from get.
fn insert_then_get_returns_fields<S: Backend, F: Fn() -> S>(factory: &F) -> Result<(), String> {
    let s = factory();
    let item = make_item("Hello");
    let id = s.insert_item(&item).map_err(|e| e.to_string())?;
    let back = s.get_item(id).map_err(|e| e.to_string())?;
    expect_eq("id", back.id, Some(id))?;
    for (name, value) in &item.fields {
        expect_eq(name, back.field(name), Some(value.as_str()))?;
    }
    Ok(())
}

/// The store assigns ids; a stale id on the input never overwrites a record.
fn insert_ignores_supplied_id<S: Backend, F: Fn() -> S>(factory: &F) -> Result<(), String> {
    let s = factory();
    let first = s.insert_item(&make_item("First")).map_err(|e| e.to_string())?;
    let mut copy = make_item("Second");
    copy.id = Some(first);
    let second = s.insert_item(&copy).map_err(|e| e.to_string())?;
    if second == first {
        return Err(format!("insert reused supplied id {}", first));
    }
    let original = s.get_item(first).map_err(|e| e.to_string())?;
    expect_eq("first title", original.field(fields::TITLE), Some("First"))
}

fn update_changes_only_given_fields<S: Backend, F: Fn() -> S>(
    factory: &F,
) -> Result<(), String> {
    let s = factory();
    let id = s.insert_item(&make_item("Before")).map_err(|e| e.to_string())?;
    let mut changes = BTreeMap::new();
    changes.insert(fields::CONTENT.to_string(), "<p>after</p>".to_string());
    s.update_item_fields(id, &changes)
        .map_err(|e| e.to_string())?;
    let back = s.get_item(id).map_err(|e| e.to_string())?;
    expect_eq("content", back.content(), "<p>after</p>")?;
    expect_eq("title", back.field(fields::TITLE), Some("Before"))
}

fn missing_item_is_not_found<S: Backend, F: Fn() -> S>(factory: &F) -> Result<(), String> {
    let s = factory();
    match s.get_item(i64::MAX) {
        Err(StoreError::ItemNotFound { .. }) => Ok(()),
        Err(other) => Err(format!("expected ItemNotFound, got {}", other)),
        Ok(_) => Err("missing item was found".to_string()),
    }
}

/// Setting terms replaces the previous assignment rather than merging.
fn term_assignment_replaces<S: Backend, F: Fn() -> S>(factory: &F) -> Result<(), String> {
    let s = factory();
    let id = s.insert_item(&make_item("Tagged")).map_err(|e| e.to_string())?;
    let first = vec!["news".to_string(), "events".to_string()];
    s.set_term_slugs(id, "category", &first)
        .map_err(|e| e.to_string())?;
    let second = vec!["sports".to_string()];
    s.set_term_slugs(id, "category", &second)
        .map_err(|e| e.to_string())?;
    let slugs = s.term_slugs(id, "category").map_err(|e| e.to_string())?;
    expect_eq("slugs", slugs, second)?;
    let other = s.term_slugs(id, "post_tag").map_err(|e| e.to_string())?;
    expect_eq("untouched taxonomy", other, Vec::<String>::new())
}
