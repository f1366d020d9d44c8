//! End-to-end behaviour of a k5login resource against a real directory.

use declarative::{
    ApplyContext, ApplyResult, ExecuteOptions, ExecutionPlan, Property, PropertyValue,
    ResourceDiff, compute_diffs, execute_simple, reconcile,
};
use k5login::{
    ContextBackend, ContextField, ContextSupport, DefaultContexts, DesiredState, Ensure, K5login,
    Mode, NoContext, PropertyKind, SecurityContext,
};
use std::collections::HashMap;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Labels kept in memory. Files start out with a home-directory label.
#[derive(Debug, Default)]
struct FakeLabels {
    labels: Mutex<HashMap<PathBuf, SecurityContext>>,
}

impl ContextBackend for FakeLabels {
    fn supports_context(&self, _path: &Path) -> bool {
        true
    }

    fn get_context(&self, path: &Path) -> k5login::Result<Option<SecurityContext>> {
        if !path.exists() {
            return Ok(None);
        }
        let labels = self.labels.lock().unwrap();
        Ok(Some(labels.get(path).cloned().unwrap_or_else(|| {
            SecurityContext::new("unconfined_u", "object_r", "user_home_t", "s0")
        })))
    }

    fn set_context(&self, path: &Path, context: &SecurityContext) -> k5login::Result<()> {
        self.labels
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), context.clone());
        Ok(())
    }
}

fn principals(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn unlabeled(path: &Path, desired: DesiredState) -> K5login {
    K5login::new(path, desired, Arc::new(NoContext), &DefaultContexts::builtin()).unwrap()
}

fn permission_bits(path: &Path) -> u32 {
    fs::metadata(path).unwrap().permissions().mode() & 0o7777
}

#[test]
fn test_principals_round_trip() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join(".k5login");
    let wanted = principals(&["daniel@EXAMPLE.COM", "george@EXAMPLE.COM"]);
    let k5 = unlabeled(&path, DesiredState::present(wanted.clone()));

    k5.create().unwrap();
    assert_eq!(k5.principals().unwrap(), Some(wanted));
    assert_eq!(
        fs::read(&path).unwrap(),
        b"daniel@EXAMPLE.COM\ngeorge@EXAMPLE.COM\n"
    );
}

#[test]
fn test_empty_list_round_trip() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join(".k5login");
    let k5 = unlabeled(&path, DesiredState::present(Vec::new()));

    k5.create().unwrap();
    assert!(k5.exists());
    assert_eq!(fs::metadata(&path).unwrap().len(), 0);
    assert_eq!(k5.principals().unwrap(), Some(Vec::new()));
}

#[test]
fn test_mode_round_trip() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join(".k5login");
    let k5 = unlabeled(&path, DesiredState::present(principals(&["a@EXAMPLE.COM"])));
    k5.create().unwrap();

    for mode in ["400", "600", "644", "664", "700"] {
        k5.set_mode(mode).unwrap();
        assert_eq!(k5.mode().map(|m| m.to_string()).as_deref(), Some(mode));
    }
}

#[test]
fn test_exists_follows_create_and_destroy() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join(".k5login");
    let k5 = unlabeled(&path, DesiredState::present(Vec::new()));

    assert!(!k5.exists());
    k5.create().unwrap();
    assert!(k5.exists());
    k5.destroy().unwrap();
    assert!(!k5.exists());
    assert!(k5.destroy().unwrap_err().is_not_found());
}

#[test]
fn test_rewriting_same_principals_is_idempotent() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join(".k5login");
    let wanted = principals(&["daniel@EXAMPLE.COM"]);
    let k5 = unlabeled(&path, DesiredState::present(wanted.clone()));

    k5.create().unwrap();
    let first = fs::read(&path).unwrap();
    k5.set_principals(&wanted).unwrap();
    k5.set_principals(&wanted).unwrap();
    assert_eq!(fs::read(&path).unwrap(), first);
}

#[test]
fn test_create_with_restrictive_mode() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join(".k5login");
    let k5 = unlabeled(
        &path,
        DesiredState::present(principals(&["daniel@EXAMPLE.COM"]))
            .with_mode(Mode::parse("400").unwrap()),
    );

    k5.create().unwrap();
    assert_eq!(permission_bits(&path), 0o400);
    assert_eq!(fs::read_to_string(&path).unwrap(), "daniel@EXAMPLE.COM\n");
}

#[test]
fn test_rewrite_keeps_existing_mode() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join(".k5login");
    fs::write(&path, "old@EXAMPLE.COM\n").unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o600)).unwrap();
    let k5 = unlabeled(&path, DesiredState::present(principals(&["new@EXAMPLE.COM"])));

    k5.set_principals(&principals(&["new@EXAMPLE.COM"])).unwrap();
    assert_eq!(permission_bits(&path), 0o600);
    assert_eq!(fs::read_to_string(&path).unwrap(), "new@EXAMPLE.COM\n");
}

#[test]
fn test_missing_grandparent_reads_as_absent() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("foo/bar/baz/non-existent");
    let k5 = unlabeled(&path, DesiredState::default());

    assert!(!k5.exists());
    assert_eq!(k5.principals().unwrap(), None);
    assert_eq!(k5.mode(), None);
    assert!(k5.create().is_err());
}

#[test]
fn test_context_in_sync_without_support() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join(".k5login");
    fs::write(&path, "").unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();
    let k5 = unlabeled(
        &path,
        DesiredState::default().with_context(SecurityContext::new(
            "user_u",
            "object_r",
            "newcontext_t",
            "s0",
        )),
    );

    for field in ContextField::ALL {
        let prop = k5.property(PropertyKind::Context(field));
        assert!(prop.is_in_sync(&PropertyValue::text("oldcontext")));
    }
    let events = reconcile(&k5, &mut ApplyContext::default());
    assert!(events.iter().all(|e| e.result == ApplyResult::NoChange));
}

#[test]
fn test_reconcile_creates_file_and_labels_it() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join(".k5login");
    let backend = Arc::new(FakeLabels::default());
    let k5 = K5login::new(
        &path,
        DesiredState::present(principals(&["daniel@EXAMPLE.COM"]))
            .with_mode(Mode::parse("600").unwrap()),
        backend.clone(),
        &DefaultContexts::builtin(),
    )
    .unwrap();
    assert_eq!(k5.support(), ContextSupport::Supported);

    let events = reconcile(&k5, &mut ApplyContext::default());
    assert_eq!(events[0].property, "ensure");
    assert_eq!(events[0].result, ApplyResult::Created);
    assert!(events.iter().all(|e| e.result.is_success()));

    assert_eq!(fs::read_to_string(&path).unwrap(), "daniel@EXAMPLE.COM\n");
    assert_eq!(permission_bits(&path), 0o600);
    let label = backend.get_context(&path).unwrap().unwrap();
    assert_eq!(label.to_string(), "user_u:object_r:krb5_home_t:s0");

    let snapshot = k5.snapshot().unwrap();
    assert!(snapshot.exists);
    assert_eq!(snapshot.mode, Some(Mode::parse("600").unwrap()));
    assert_eq!(snapshot.context, label);

    // A second pass finds nothing to do.
    let events = reconcile(&k5, &mut ApplyContext::default());
    assert!(events.iter().all(|e| e.result == ApplyResult::NoChange));
    assert!(ResourceDiff::from_resource(&k5).unwrap().is_none());
}

#[test]
fn test_reconcile_changes_single_label_field() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join(".k5login");
    fs::write(&path, "").unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();
    let backend = Arc::new(FakeLabels::default());
    backend
        .set_context(
            &path,
            &SecurityContext::new("user_u", "object_r", "krb5_home_t", "s0"),
        )
        .unwrap();

    let desired = DesiredState::present(Vec::new()).with_context(SecurityContext {
        type_: Some("newcontext_t".to_string()),
        ..Default::default()
    });
    let k5 = K5login::new(&path, desired, backend.clone(), &DefaultContexts::builtin()).unwrap();

    let events = reconcile(&k5, &mut ApplyContext::default());
    let changed: Vec<_> = events
        .iter()
        .filter(|e| e.result.is_change())
        .map(|e| e.property.as_str())
        .collect();
    assert_eq!(changed, ["seltype"]);
    assert_eq!(
        backend.get_context(&path).unwrap().unwrap().to_string(),
        "user_u:object_r:newcontext_t:s0"
    );
}

#[test]
fn test_reconcile_removes_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join(".k5login");
    fs::write(&path, "daniel@EXAMPLE.COM\n").unwrap();
    let k5 = unlabeled(&path, DesiredState::absent());
    assert_eq!(k5.desired().ensure, Ensure::Absent);

    let events = reconcile(&k5, &mut ApplyContext::default());
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].result, ApplyResult::Removed);
    assert!(!path.exists());
}

#[test]
fn test_dry_run_leaves_file_alone() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join(".k5login");
    fs::write(&path, "old@EXAMPLE.COM\n").unwrap();
    let k5 = unlabeled(&path, DesiredState::present(principals(&["new@EXAMPLE.COM"])));

    let diff = ResourceDiff::from_resource(&k5).unwrap().unwrap();
    assert!(diff.is_modification());
    assert_eq!(diff.changes[0].property, "principals");

    let events = reconcile(&k5, &mut ApplyContext::new(true, false));
    assert!(
        events
            .iter()
            .any(|e| matches!(e.result, ApplyResult::Skipped { .. }))
    );
    assert_eq!(fs::read_to_string(&path).unwrap(), "old@EXAMPLE.COM\n");
}

#[test]
fn test_directory_in_the_way_fails() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join(".k5login");
    fs::create_dir(&path).unwrap();
    let wanted = DesiredState::present(principals(&["daniel@EXAMPLE.COM"]));

    let k5 = unlabeled(&path, wanted.clone());
    let events = reconcile(&k5, &mut ApplyContext::default());
    assert_eq!(events[0].result, ApplyResult::NoChange);
    let last = events.last().unwrap();
    assert_eq!(last.property, "principals");
    assert!(matches!(last.result, ApplyResult::Failed { .. }));

    let mut plan = ExecutionPlan::new();
    plan.add_resource(Box::new(unlabeled(&path, wanted)));
    let report = compute_diffs(&plan.resources);
    assert_eq!(report.unreadable.len(), 1);

    let summary = execute_simple(plan, ExecuteOptions::default()).unwrap();
    assert_eq!(summary.failed, 1);
    assert!(!summary.is_success());
    assert!(path.is_dir());
}
