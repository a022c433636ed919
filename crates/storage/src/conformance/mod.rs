//! Conformance test suite for platform backends.
//!
//! This module provides a backend-agnostic test suite that any backend
//! implementing the storage traits can run to verify the behavior the
//! cloning engine relies on:
//!
//! - **Tenant**: push/pop restores the previous tenant, unknown tenants are
//!   rejected, data is isolated per tenant
//! - **Content**: inserted items are readable, ids are assigned by the store
//! - **Taxonomy**: assignment replaces rather than merges
//! - **Metadata**: duplicate keys keep every value in order
//! - **Files**: collision-free names, upload directory per tenant
//!
//! # Usage
//!
//! Backend crates call [`run_conformance_suite`] with a factory that
//! creates a fresh installation with at least two sites for each test:
//!
//! ```ignore
//! use sitecopy_storage::conformance::run_conformance_suite;
//!
//! #[test]
//! fn memory_conformance() {
//!     let report = run_conformance_suite(|| make_installation());
//!     assert!(report.failed == 0, "{report}");
//! }
//! ```

mod content;
mod files;
mod meta;
mod tenant;

use std::fmt;

use crate::record::{fields, ContentItem, TenantId};
use crate::traits::{ContentPlatform, FileStorage, SiteDirectory};

/// Capabilities a backend must provide to run the suite.
pub trait Backend: ContentPlatform + FileStorage + SiteDirectory {}

impl<T: ContentPlatform + FileStorage + SiteDirectory> Backend for T {}

/// Result of a single conformance test.
#[derive(Debug, Clone)]
pub struct TestResult {
    /// Test category (e.g. "tenant", "meta").
    pub category: String,
    /// Test name (e.g. "pop_restores_previous_tenant").
    pub name: String,
    /// Whether the test passed.
    pub passed: bool,
    /// Error message if the test failed.
    pub message: Option<String>,
}

impl TestResult {
    fn pass(category: &str, name: &str) -> Self {
        Self {
            category: category.to_string(),
            name: name.to_string(),
            passed: true,
            message: None,
        }
    }

    fn fail(category: &str, name: &str, msg: String) -> Self {
        Self {
            category: category.to_string(),
            name: name.to_string(),
            passed: false,
            message: Some(msg),
        }
    }

    fn from_result(category: &str, name: &str, result: Result<(), String>) -> Self {
        match result {
            Ok(()) => Self::pass(category, name),
            Err(msg) => Self::fail(category, name, msg),
        }
    }
}

/// Aggregated report from a full conformance suite run.
#[derive(Debug, Clone)]
pub struct ConformanceReport {
    pub results: Vec<TestResult>,
    pub passed: usize,
    pub failed: usize,
    pub total: usize,
}

impl fmt::Display for ConformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Conformance: {}/{} passed ({} failed)",
            self.passed, self.total, self.failed
        )?;
        for r in &self.results {
            if !r.passed {
                writeln!(
                    f,
                    "  FAIL [{}/{}]: {}",
                    r.category,
                    r.name,
                    r.message.as_deref().unwrap_or("(no message)")
                )?;
            }
        }
        Ok(())
    }
}

/// Run the full conformance suite against a backend.
///
/// The `factory` function is called once per test to create a fresh
/// installation, ensuring test isolation.
pub fn run_conformance_suite<S, F>(factory: F) -> ConformanceReport
where
    S: Backend,
    F: Fn() -> S,
{
    let mut results = Vec::new();

    results.extend(tenant::run_tenant_tests(&factory));
    results.extend(content::run_content_tests(&factory));
    results.extend(meta::run_meta_tests(&factory));
    results.extend(files::run_file_tests(&factory));

    let passed = results.iter().filter(|r| r.passed).count();
    let total = results.len();

    ConformanceReport {
        results,
        passed,
        failed: total - passed,
        total,
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

/// The first two sites of the installation.
fn two_sites<S: Backend>(s: &S) -> Result<(TenantId, TenantId), String> {
    let sites = s.sites().map_err(|e| e.to_string())?;
    match sites.as_slice() {
        [a, b, ..] => Ok((a.id, b.id)),
        _ => Err(format!(
            "conformance needs at least two sites, backend has {}",
            sites.len()
        )),
    }
}

fn make_item(title: &str) -> ContentItem {
    ContentItem::new()
        .with_field(fields::TITLE, title)
        .with_field(fields::CONTENT, format!("<p>{}</p>", title))
        .with_field(fields::STATUS, "publish")
        .with_field(fields::TYPE, "post")
}

fn expect_eq<T: PartialEq + fmt::Debug>(what: &str, got: T, want: T) -> Result<(), String> {
    if got == want {
        Ok(())
    } else {
        Err(format!("{}: expected {:?}, got {:?}", what, want, got))
    }
}
