use super::{expect_eq, make_item, Backend, TestResult};

pub(super) fn run_meta_tests<S, F>(factory: &F) -> Vec<TestResult>
where
    S: Backend,
    F: Fn() -> S,
{
    vec![
        TestResult::from_result(
            "meta",
            "add_keeps_duplicate_values_in_order",
            add_keeps_duplicate_values_in_order(factory),
        ),
        TestResult::from_result(
            "meta",
            "update_replaces_all_values",
            update_replaces_all_values(factory),
        ),
        TestResult::from_result(
            "meta",
            "values_are_stored_verbatim",
            values_are_stored_verbatim(factory),
        ),
        TestResult::from_result(
            "meta",
            "new_item_has_no_meta",
            new_item_has_no_meta(factory),
        ),
    ]
}

// ── Test implementations ─────────────────────────────────────────────────────

fn add_keeps_duplicate_values_in_order<S: Backend, F: Fn() -> S>(
    factory: &F,
) -> Result<(), String> {
    let s = factory();
    let id = s.insert_item(&make_item("Meta")).map_err(|e| e.to_string())?;
    for v in ["one", "two", "three"] {
        s.add_meta(id, "color", v).map_err(|e| e.to_string())?;
    }
    s.add_meta(id, "size", "L").map_err(|e| e.to_string())?;
    let meta = s.all_meta(id).map_err(|e| e.to_string())?;
    expect_eq(
        "color values",
        meta.get("color").map(|v| v.to_vec()),
        Some(vec!["one".to_string(), "two".to_string(), "three".to_string()]),
    )?;
    expect_eq("total", meta.len(), 4)
}

fn update_replaces_all_values<S: Backend, F: Fn() -> S>(factory: &F) -> Result<(), String> {
    let s = factory();
    let id = s.insert_item(&make_item("Meta")).map_err(|e| e.to_string())?;
    s.add_meta(id, "k", "a").map_err(|e| e.to_string())?;
    s.add_meta(id, "k", "b").map_err(|e| e.to_string())?;
    s.update_meta(id, "k", "c").map_err(|e| e.to_string())?;
    let meta = s.all_meta(id).map_err(|e| e.to_string())?;
    expect_eq(
        "values",
        meta.get("k").map(|v| v.to_vec()),
        Some(vec!["c".to_string()]),
    )
}

/// Encoded blobs and multi-byte text come back byte for byte.
fn values_are_stored_verbatim<S: Backend, F: Fn() -> S>(factory: &F) -> Result<(), String> {
    let s = factory();
    let id = s.insert_item(&make_item("Meta")).map_err(|e| e.to_string())?;
    let blob = "a:1:{s:3:\"url\";s:9:\"héllo.jpg\";}";
    s.add_meta(id, "blob", blob).map_err(|e| e.to_string())?;
    let back = s.get_meta(id, "blob").map_err(|e| e.to_string())?;
    expect_eq("blob", back.as_deref(), Some(blob))
}

fn new_item_has_no_meta<S: Backend, F: Fn() -> S>(factory: &F) -> Result<(), String> {
    let s = factory();
    let id = s.insert_item(&make_item("Bare")).map_err(|e| e.to_string())?;
    let meta = s.all_meta(id).map_err(|e| e.to_string())?;
    expect_eq("meta count", meta.len(), 0)
}
