//! State probe: read the current on-disk state without side effects.
//!
//! Anything that stops a path from being reached (a missing parent, a
//! component that is a regular file, an unreadable directory) is reported as
//! "does not exist". Nothing is cached; every call goes to the filesystem.

use crate::error::{Error, Result};
use crate::format;
use crate::mode::Mode;
use crate::selinux::{ContextBackend, ContextSupport, SecurityContext};
use std::fs::{self, Metadata};
use std::io;
use std::os::unix::fs::MetadataExt;
use std::path::Path;

/// Metadata for `path`, or `None` when it cannot be reached.
pub fn stat(path: &Path) -> Option<Metadata> {
    fs::metadata(path).ok()
}

/// Whether the file exists.
pub fn exists(path: &Path) -> bool {
    stat(path).is_some()
}

/// Principals in file order, or `None` when the file does not exist.
///
/// An existing file that cannot be read is an error: reporting it as absent
/// would hide a real difference. So is content that is not UTF-8, since
/// rewriting it from a lossy decode would change principals nobody declared.
pub fn read_principals(path: &Path) -> Result<Option<Vec<String>>> {
    if !exists(path) {
        return Ok(None);
    }
    match fs::read(path) {
        Ok(bytes) => match String::from_utf8(bytes) {
            Ok(text) => Ok(Some(format::parse(&text))),
            Err(e) => Err(Error::io(path, io::Error::new(io::ErrorKind::InvalidData, e))),
        },
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::io(path, e)),
    }
}

/// Permission bits, or `None` when the file does not exist.
pub fn read_mode(path: &Path) -> Option<Mode> {
    stat(path).map(|meta| Mode::from_raw(meta.mode()))
}

/// Current label, all fields unset without support or without a file.
pub fn read_security_context(
    path: &Path,
    backend: &dyn ContextBackend,
    support: ContextSupport,
) -> Result<SecurityContext> {
    if !support.is_supported() || !exists(path) {
        return Ok(SecurityContext::default());
    }
    Ok(backend.get_context(path)?.unwrap_or_default())
}

/// Everything the probe knows about one path, read in one go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub exists: bool,
    pub principals: Option<Vec<String>>,
    pub mode: Option<Mode>,
    pub context: SecurityContext,
}

impl Snapshot {
    pub fn take(
        path: &Path,
        backend: &dyn ContextBackend,
        support: ContextSupport,
    ) -> Result<Self> {
        Ok(Self {
            exists: exists(path),
            principals: read_principals(path)?,
            mode: read_mode(path),
            context: read_security_context(path, backend, support)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selinux::NoContext;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_absent() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("k5login");

        assert!(!exists(&path));
        assert!(stat(&path).is_none());
        assert_eq!(read_principals(&path).unwrap(), None);
        assert_eq!(read_mode(&path), None);
    }

    #[test]
    fn test_missing_grandparent_is_absent() {
        let path = Path::new("/foo/bar/baz/non-existent");
        assert!(!exists(path));
        assert_eq!(read_principals(path).unwrap(), None);
    }

    #[test]
    fn test_non_directory_component_is_absent() {
        let temp = TempDir::new().unwrap();
        let regular = temp.path().join("ENOTDIR_test");
        fs::write(&regular, "").unwrap();

        let impossible = regular.join("some_file");
        assert!(stat(&impossible).is_none());
        assert!(!exists(&impossible));
    }

    #[test]
    fn test_unreadable_parent_is_absent() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("locked");
        fs::create_dir(&dir).unwrap();
        fs::set_permissions(&dir, fs::Permissions::from_mode(0)).unwrap();

        // As root the directory is still searchable, but the child does not
        // exist either way.
        assert!(stat(&dir.join("some_file")).is_none());

        fs::set_permissions(&dir, fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[test]
    fn test_empty_file_has_no_principals() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("k5login");
        fs::write(&path, "").unwrap();

        assert_eq!(read_principals(&path).unwrap(), Some(vec![]));
        assert!(read_mode(&path).is_some());
    }

    #[test]
    fn test_read_one_principal() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("k5login");
        fs::write(&path, "daniel@EXAMPLE.COM\n").unwrap();

        assert_eq!(
            read_principals(&path).unwrap(),
            Some(vec!["daniel@EXAMPLE.COM".to_string()])
        );
    }

    #[test]
    fn test_non_utf8_content_is_an_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("k5login");
        fs::write(&path, b"daniel@EXAMPLE.COM\n\xff\xfe\n").unwrap();

        let err = read_principals(&path).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
        assert!(err.to_string().contains("k5login"));
    }

    #[test]
    fn test_directory_is_an_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("k5login");
        fs::create_dir(&path).unwrap();

        assert!(exists(&path));
        assert!(read_principals(&path).is_err());
    }

    #[test]
    fn test_read_mode_masks_type_bits() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("k5login");
        fs::write(&path, "").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o600)).unwrap();

        assert_eq!(read_mode(&path).map(|m| m.to_string()), Some("600".to_string()));
    }

    #[test]
    fn test_context_without_support_is_empty() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("k5login");
        fs::write(&path, "").unwrap();

        let ctx = read_security_context(&path, &NoContext, ContextSupport::Unsupported).unwrap();
        assert!(ctx.is_empty());
    }

    #[test]
    fn test_snapshot_of_present_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("k5login");
        fs::write(&path, "a@X\nb@X\n").unwrap();

        let snapshot = Snapshot::take(&path, &NoContext, ContextSupport::Unsupported).unwrap();
        assert!(snapshot.exists);
        assert_eq!(snapshot.principals.map(|p| p.len()), Some(2));
        assert!(snapshot.context.is_empty());
    }
}
