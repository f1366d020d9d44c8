//! Reconciler: the mutations that move a k5login file toward its declared
//! state, one property at a time.
//!
//! Every function performs exactly one kind of change and returns the
//! filesystem error unmodified when it fails. Deciding whether a change is
//! needed is the caller's job (see [`crate::property`]).

use crate::atomic;
use crate::error::{Error, Result};
use crate::format;
use crate::mode::{self, Mode};
use crate::probe;
use crate::selinux::{ContextBackend, ContextField, ContextSupport};
use std::fs::{self, Permissions};
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

/// Outcome of a label write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextWrite {
    /// The label was rewritten
    Applied,
    /// Nothing to do: no platform support, or the field already matched
    NoOp,
}

/// Create the file with `principals`, then bring it to `desired_mode`.
///
/// The file is always first written with the default mode; the chmod only
/// happens when that differs from `desired_mode`. Callers check
/// [`probe::exists`] first, an existing file would simply be rewritten.
pub fn ensure_create(path: &Path, principals: &[String], desired_mode: Mode) -> Result<()> {
    write_principals(path, principals)?;

    let current = probe::read_mode(path).ok_or_else(|| Error::NotFound(path.to_path_buf()))?;
    if !mode::current_mode_equals_desired(current, desired_mode) {
        apply_mode(path, desired_mode)?;
    }
    Ok(())
}

/// Remove the file. Fails with [`Error::NotFound`] if it is already gone.
pub fn ensure_destroy(path: &Path) -> Result<()> {
    fs::remove_file(path).map_err(|e| Error::io(path, e))
}

/// Rewrite the whole file through an atomic replace.
pub fn set_principals(path: &Path, principals: &[String]) -> Result<()> {
    write_principals(path, principals)
}

/// Parse an octal mode string (leading `0` optional) and apply it.
pub fn set_mode(path: &Path, octal: &str) -> Result<()> {
    apply_mode(path, Mode::parse(octal)?)
}

/// Apply permission bits; file-type bits are never touched.
pub fn apply_mode(path: &Path, mode: Mode) -> Result<()> {
    fs::set_permissions(path, Permissions::from_mode(mode.bits())).map_err(|e| Error::io(path, e))
}

/// Change one field of the file's label, leaving the other three as found.
pub fn set_context_field(
    path: &Path,
    backend: &dyn ContextBackend,
    support: ContextSupport,
    field: ContextField,
    value: &str,
) -> Result<ContextWrite> {
    if !support.is_supported() {
        return Ok(ContextWrite::NoOp);
    }
    if !probe::exists(path) {
        return Err(Error::NotFound(path.to_path_buf()));
    }

    let mut context = backend.get_context(path)?.ok_or_else(|| Error::Context {
        path: path.to_path_buf(),
        message: "file carries no label to amend".to_string(),
    })?;
    if context.get(field) == Some(value) {
        return Ok(ContextWrite::NoOp);
    }

    context.set(field, value);
    backend.set_context(path, &context)?;
    Ok(ContextWrite::Applied)
}

fn write_principals(path: &Path, principals: &[String]) -> Result<()> {
    format::validate(principals)?;
    atomic::replace_file(path, Mode::DEFAULT, |f| format::write_to(f, principals))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selinux::{NoContext, SecurityContext};
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Debug, Default)]
    struct MemoryLabels {
        labels: Mutex<HashMap<PathBuf, SecurityContext>>,
    }

    impl ContextBackend for MemoryLabels {
        fn supports_context(&self, _path: &Path) -> bool {
            true
        }

        fn get_context(&self, path: &Path) -> Result<Option<SecurityContext>> {
            Ok(self.labels.lock().unwrap().get(path).cloned())
        }

        fn set_context(&self, path: &Path, context: &SecurityContext) -> Result<()> {
            self.labels
                .lock()
                .unwrap()
                .insert(path.to_path_buf(), context.clone());
            Ok(())
        }
    }

    fn list(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_create_with_default_mode_skips_chmod() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("k5login");

        ensure_create(&path, &list(&["fred@EXAMPLE.COM"]), Mode::DEFAULT).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "fred@EXAMPLE.COM\n");
        assert_eq!(probe::read_mode(&path), Some(Mode::DEFAULT));
    }

    #[test]
    fn test_create_with_restrictive_mode() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("k5login");

        ensure_create(&path, &[], Mode::parse("400").unwrap()).unwrap();

        assert_eq!(probe::read_mode(&path).unwrap().to_string(), "400");
        assert_eq!(fs::read(&path).unwrap(), b"");
    }

    #[test]
    fn test_destroy_missing_file_is_not_found() {
        let temp = TempDir::new().unwrap();
        let result = ensure_destroy(&temp.path().join("k5login"));
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[test]
    fn test_set_mode_rejects_garbage() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("k5login");
        fs::write(&path, "").unwrap();

        assert!(matches!(set_mode(&path, "9x"), Err(Error::InvalidMode { .. })));
        assert!(set_mode(&path, "0600").is_ok());
        assert_eq!(probe::read_mode(&path).unwrap().to_string(), "600");
    }

    #[test]
    fn test_set_principals_rejects_newline() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("k5login");
        fs::write(&path, "keep@X\n").unwrap();

        let result = set_principals(&path, &list(&["a\nb"]));

        assert!(matches!(result, Err(Error::UnrepresentablePrincipal(_))));
        assert_eq!(fs::read_to_string(&path).unwrap(), "keep@X\n");
    }

    #[test]
    fn test_context_write_without_support_is_noop() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("k5login");

        let outcome = set_context_field(
            &path,
            &NoContext,
            ContextSupport::Unsupported,
            ContextField::Type,
            "krb5_home_t",
        )
        .unwrap();

        assert_eq!(outcome, ContextWrite::NoOp);
    }

    #[test]
    fn test_context_write_changes_one_field() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("k5login");
        fs::write(&path, "").unwrap();
        let backend = MemoryLabels::default();
        backend
            .set_context(&path, &SecurityContext::parse("user_u:object_r:user_home_t:s0"))
            .unwrap();

        let outcome = set_context_field(
            &path,
            &backend,
            ContextSupport::Supported,
            ContextField::Type,
            "krb5_home_t",
        )
        .unwrap();

        assert_eq!(outcome, ContextWrite::Applied);
        let label = backend.get_context(&path).unwrap().unwrap();
        assert_eq!(label.to_string(), "user_u:object_r:krb5_home_t:s0");
    }

    #[test]
    fn test_context_write_on_missing_file() {
        let temp = TempDir::new().unwrap();
        let result = set_context_field(
            &temp.path().join("k5login"),
            &MemoryLabels::default(),
            ContextSupport::Supported,
            ContextField::User,
            "user_u",
        );
        assert!(matches!(result, Err(Error::NotFound(_))));
    }
}
