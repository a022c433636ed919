//! Runs the backend conformance suite against the in-memory installation.

use std::cell::Cell;

use sitecopy_storage::conformance::run_conformance_suite;
use sitecopy_storage::MemoryInstallation;
use tempfile::TempDir;

#[test]
fn test_memory_installation_conforms() {
    let root = TempDir::new().unwrap();
    let runs = Cell::new(0);
    let report = run_conformance_suite(|| {
        runs.set(runs.get() + 1);
        MemoryInstallation::new(root.path().join(format!("run-{}", runs.get())))
            .with_site(1, "Main", "https://example.test")
            .with_site(2, "Shop", "https://example.test/shop")
    });
    assert!(report.total > 0);
    assert!(report.failed == 0, "{report}");
}
