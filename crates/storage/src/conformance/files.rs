use super::{expect_eq, two_sites, Backend, TestResult};
use crate::traits::TenantScope;

pub(super) fn run_file_tests<S, F>(factory: &F) -> Vec<TestResult>
where
    S: Backend,
    F: Fn() -> S,
{
    vec![
        TestResult::from_result(
            "files",
            "upload_dirs_differ_per_tenant",
            upload_dirs_differ_per_tenant(factory),
        ),
        TestResult::from_result(
            "files",
            "unique_filename_avoids_existing",
            unique_filename_avoids_existing(factory),
        ),
        TestResult::from_result(
            "files",
            "copy_file_duplicates_bytes",
            copy_file_duplicates_bytes(factory),
        ),
    ]
}

// ── Test implementations ─────────────────────────────────────────────────────

fn upload_dirs_differ_per_tenant<S: Backend, F: Fn() -> S>(factory: &F) -> Result<(), String> {
    let s = factory();
    let (_, other) = two_sites(&s)?;
    let here = s.upload_dir().map_err(|e| e.to_string())?;
    let there = {
        let _scope = TenantScope::enter(&s, other).map_err(|e| e.to_string())?;
        s.upload_dir().map_err(|e| e.to_string())?
    };
    if here.path == there.path || here.url == there.url {
        return Err(format!(
            "tenants share an upload directory: {} / {}",
            here.path.display(),
            here.url
        ));
    }
    Ok(())
}

fn unique_filename_avoids_existing<S: Backend, F: Fn() -> S>(
    factory: &F,
) -> Result<(), String> {
    let s = factory();
    let dir = s.upload_dir().map_err(|e| e.to_string())?;
    s.create_dir_all(&dir.path).map_err(|e| e.to_string())?;
    let first = s.unique_filename(&dir.path, "conformance.jpg");
    std::fs::write(dir.path.join(&first), b"x").map_err(|e| e.to_string())?;
    let second = s.unique_filename(&dir.path, "conformance.jpg");
    if first == second {
        return Err(format!("unique_filename returned taken name {}", first));
    }
    if s.file_exists(&dir.path.join(&second)) {
        return Err(format!("{} already exists", second));
    }
    Ok(())
}

fn copy_file_duplicates_bytes<S: Backend, F: Fn() -> S>(factory: &F) -> Result<(), String> {
    let s = factory();
    let dir = s.upload_dir().map_err(|e| e.to_string())?;
    s.create_dir_all(&dir.path).map_err(|e| e.to_string())?;
    let from = dir.path.join(s.unique_filename(&dir.path, "source.bin"));
    std::fs::write(&from, b"\x00\x01payload").map_err(|e| e.to_string())?;
    let to = dir.path.join(s.unique_filename(&dir.path, "copy.bin"));
    s.copy_file(&from, &to).map_err(|e| e.to_string())?;
    let bytes = std::fs::read(&to).map_err(|e| e.to_string())?;
    expect_eq("copied bytes", bytes.as_slice(), b"\x00\x01payload".as_slice())
}
