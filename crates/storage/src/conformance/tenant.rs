use super::{expect_eq, make_item, two_sites, Backend, TestResult};
use crate::traits::TenantScope;
use crate::StoreError;

pub(super) fn run_tenant_tests<S, F>(factory: &F) -> Vec<TestResult>
where
    S: Backend,
    F: Fn() -> S,
{
    vec![
        TestResult::from_result(
            "tenant",
            "pop_restores_previous_tenant",
            pop_restores_previous_tenant(factory),
        ),
        TestResult::from_result(
            "tenant",
            "nested_pushes_unwind_in_order",
            nested_pushes_unwind_in_order(factory),
        ),
        TestResult::from_result(
            "tenant",
            "unknown_tenant_is_rejected",
            unknown_tenant_is_rejected(factory),
        ),
        TestResult::from_result(
            "tenant",
            "scope_restores_on_early_return",
            scope_restores_on_early_return(factory),
        ),
        TestResult::from_result(
            "tenant",
            "items_are_isolated_per_tenant",
            items_are_isolated_per_tenant(factory),
        ),
    ]
}

// ── Test implementations ─────────────────────────────────────────────────────

/// push then pop returns to the original tenant.
fn pop_restores_previous_tenant<S: Backend, F: Fn() -> S>(factory: &F) -> Result<(), String> {
    let s = factory();
    let (_, other) = two_sites(&s)?;
    let start = s.current_tenant();
    s.push_tenant(other).map_err(|e| e.to_string())?;
    expect_eq("current after push", s.current_tenant(), other)?;
    let restored = s.pop_tenant().map_err(|e| e.to_string())?;
    expect_eq("pop result", restored, start)?;
    expect_eq("current after pop", s.current_tenant(), start)
}

/// Two pushes need two pops to get back to the start.
fn nested_pushes_unwind_in_order<S: Backend, F: Fn() -> S>(factory: &F) -> Result<(), String> {
    let s = factory();
    let (a, b) = two_sites(&s)?;
    let start = s.current_tenant();
    s.push_tenant(b).map_err(|e| e.to_string())?;
    s.push_tenant(a).map_err(|e| e.to_string())?;
    expect_eq("first pop", s.pop_tenant().map_err(|e| e.to_string())?, b)?;
    expect_eq("second pop", s.pop_tenant().map_err(|e| e.to_string())?, start)
}

/// Pushing a tenant that does not exist fails and leaves the context alone.
fn unknown_tenant_is_rejected<S: Backend, F: Fn() -> S>(factory: &F) -> Result<(), String> {
    let s = factory();
    let start = s.current_tenant();
    match s.push_tenant(i64::MAX) {
        Err(StoreError::TenantNotFound { .. }) => {}
        Err(other) => return Err(format!("expected TenantNotFound, got {}", other)),
        Ok(()) => return Err("push of unknown tenant succeeded".to_string()),
    }
    expect_eq("current after failed push", s.current_tenant(), start)
}

/// A scope dropped on an error path still restores the tenant.
fn scope_restores_on_early_return<S: Backend, F: Fn() -> S>(factory: &F) -> Result<(), String> {
    let s = factory();
    let (_, other) = two_sites(&s)?;
    let start = s.current_tenant();

    let attempt = || -> Result<(), StoreError> {
        let _scope = TenantScope::enter(&s, other)?;
        s.get_item(i64::MAX)?;
        Ok(())
    };
    if attempt().is_ok() {
        return Err("reading a missing item succeeded".to_string());
    }
    expect_eq("current after scope", s.current_tenant(), start)
}

/// An item inserted in one tenant is not visible in another.
fn items_are_isolated_per_tenant<S: Backend, F: Fn() -> S>(factory: &F) -> Result<(), String> {
    let s = factory();
    let (_, other) = two_sites(&s)?;
    let id = s.insert_item(&make_item("Local")).map_err(|e| e.to_string())?;

    let scope = TenantScope::enter(&s, other).map_err(|e| e.to_string())?;
    let visible = match s.get_item(id) {
        Ok(item) => item.field(crate::fields::TITLE) == Some("Local"),
        Err(_) => false,
    };
    drop(scope);

    if visible {
        return Err(format!("item {} leaked into tenant {}", id, other));
    }
    Ok(())
}
