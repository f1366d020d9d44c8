//! Security context collaborator
//!
//! Labels are four colon-separated fields (`user:role:type:range`). Reading
//! and writing them is delegated to a [`ContextBackend`]; whether labels are
//! usable at all is decided once per pass as a [`ContextSupport`] value and
//! passed along explicitly.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// A security label split into its four fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityContext {
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default, rename = "type")]
    pub type_: Option<String>,
    #[serde(default)]
    pub range: Option<String>,
}

impl SecurityContext {
    pub fn new(user: &str, role: &str, type_: &str, range: &str) -> Self {
        Self {
            user: Some(user.to_string()),
            role: Some(role.to_string()),
            type_: Some(type_.to_string()),
            range: Some(range.to_string()),
        }
    }

    /// Parse a raw label. The range keeps any further colons (`s0:c0.c1023`).
    pub fn parse(label: &str) -> Self {
        let mut parts = label.trim_end_matches('\0').splitn(4, ':');
        let mut next = || {
            parts
                .next()
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        Self {
            user: next(),
            role: next(),
            type_: next(),
            range: next(),
        }
    }

    pub fn get(&self, field: ContextField) -> Option<&str> {
        match field {
            ContextField::User => self.user.as_deref(),
            ContextField::Role => self.role.as_deref(),
            ContextField::Type => self.type_.as_deref(),
            ContextField::Range => self.range.as_deref(),
        }
    }

    pub fn set(&mut self, field: ContextField, value: &str) {
        let slot = match field {
            ContextField::User => &mut self.user,
            ContextField::Role => &mut self.role,
            ContextField::Type => &mut self.type_,
            ContextField::Range => &mut self.range,
        };
        *slot = Some(value.to_string());
    }

    /// Fill any field missing here from `other`.
    pub fn or(mut self, other: &SecurityContext) -> Self {
        for field in ContextField::ALL {
            if self.get(field).is_none()
                && let Some(value) = other.get(field)
            {
                self.set(field, value);
            }
        }
        self
    }

    /// Whether all four fields are unset
    pub fn is_empty(&self) -> bool {
        ContextField::ALL.iter().all(|f| self.get(*f).is_none())
    }
}

impl fmt::Display for SecurityContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<&str> = ContextField::ALL
            .iter()
            .map_while(|field| self.get(*field))
            .collect();
        write!(f, "{}", fields.join(":"))
    }
}

/// One of the four label fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextField {
    User,
    Role,
    Type,
    Range,
}

impl ContextField {
    pub const ALL: [ContextField; 4] = [Self::User, Self::Role, Self::Type, Self::Range];

    /// Attribute name exposed to orchestrators
    pub fn attribute(&self) -> &'static str {
        match self {
            Self::User => "seluser",
            Self::Role => "selrole",
            Self::Type => "seltype",
            Self::Range => "selrange",
        }
    }
}

/// Whether labels can be read and written for the path being reconciled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextSupport {
    Supported,
    Unsupported,
}

impl ContextSupport {
    /// Ask the backend once; the answer is reused for the whole pass.
    pub fn detect(backend: &dyn ContextBackend, path: &Path) -> Self {
        if backend.supports_context(path) {
            Self::Supported
        } else {
            Self::Unsupported
        }
    }

    pub fn is_supported(&self) -> bool {
        matches!(self, Self::Supported)
    }
}

/// Query and apply security labels.
pub trait ContextBackend: Send + Sync + fmt::Debug {
    /// Whether labels work for `path` on this host
    fn supports_context(&self, path: &Path) -> bool;

    /// Current label of `path`, `None` if it carries none
    fn get_context(&self, path: &Path) -> Result<Option<SecurityContext>>;

    /// Replace the label of `path`
    fn set_context(&self, path: &Path, context: &SecurityContext) -> Result<()>;
}

/// Backend for hosts without labels. Reads report nothing, writes fail.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoContext;

impl ContextBackend for NoContext {
    fn supports_context(&self, _path: &Path) -> bool {
        false
    }

    fn get_context(&self, _path: &Path) -> Result<Option<SecurityContext>> {
        Ok(None)
    }

    fn set_context(&self, path: &Path, _context: &SecurityContext) -> Result<()> {
        Err(Error::Context {
            path: path.to_path_buf(),
            message: "security contexts are not supported".to_string(),
        })
    }
}

// ============================================================================
// Default contexts
// ============================================================================

/// Kinds of managed file that carry a default label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// A `.k5login` in a user's home directory
    K5loginHome,
}

/// Default label per resource kind, built once at startup.
#[derive(Debug, Clone)]
pub struct DefaultContexts {
    entries: HashMap<ResourceKind, SecurityContext>,
}

impl DefaultContexts {
    /// Reference policy defaults
    pub fn builtin() -> Self {
        let mut entries = HashMap::new();
        entries.insert(
            ResourceKind::K5loginHome,
            SecurityContext::new("user_u", "object_r", "krb5_home_t", "s0"),
        );
        Self { entries }
    }

    /// Override fields for one kind; unset fields keep the current default.
    pub fn with_override(mut self, kind: ResourceKind, context: SecurityContext) -> Self {
        let merged = match self.entries.remove(&kind) {
            Some(existing) => context.or(&existing),
            None => context,
        };
        self.entries.insert(kind, merged);
        self
    }

    pub fn default_for(&self, kind: ResourceKind) -> SecurityContext {
        self.entries.get(&kind).cloned().unwrap_or_default()
    }
}

impl Default for DefaultContexts {
    fn default() -> Self {
        Self::builtin()
    }
}

// ============================================================================
// Extended-attribute backend
// ============================================================================

/// Name of the extended attribute holding the label
pub const SELINUX_XATTR: &str = "security.selinux";

/// Filesystems that store labels
const LABELED_FILESYSTEMS: &[&str] = &[
    "ext2", "ext3", "ext4", "gfs", "gfs2", "xfs", "jfs", "btrfs", "tmpfs", "zfs",
];

/// Backend reading and writing the `security.selinux` xattr directly.
#[derive(Debug, Clone)]
pub struct XattrContext {
    selinuxfs: PathBuf,
    mounts: PathBuf,
}

impl XattrContext {
    pub fn new() -> Self {
        Self {
            selinuxfs: PathBuf::from("/sys/fs/selinux"),
            mounts: PathBuf::from("/proc/mounts"),
        }
    }

    fn kernel_enabled(&self) -> bool {
        self.selinuxfs.join("enforce").exists()
    }

    fn filesystem_labeled(&self, path: &Path) -> bool {
        let Ok(table) = std::fs::read_to_string(&self.mounts) else {
            return false;
        };
        let mounts = parse_mounts(&table);
        let resolved = resolve_existing(path);
        filesystem_for(&mounts, &resolved).is_some_and(is_labeled_filesystem)
    }
}

impl Default for XattrContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextBackend for XattrContext {
    fn supports_context(&self, path: &Path) -> bool {
        cfg!(target_os = "linux") && self.kernel_enabled() && self.filesystem_labeled(path)
    }

    fn get_context(&self, path: &Path) -> Result<Option<SecurityContext>> {
        let label = xattr::get(path).map_err(|e| Error::io(path, e))?;
        Ok(label.map(|l| SecurityContext::parse(&l)))
    }

    fn set_context(&self, path: &Path, context: &SecurityContext) -> Result<()> {
        xattr::set(path, &context.to_string()).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
                Error::io(path, e)
            }
            _ => Error::Context {
                path: path.to_path_buf(),
                message: e.to_string(),
            },
        })
    }
}

/// Whether `fstype` stores labels
pub fn is_labeled_filesystem(fstype: &str) -> bool {
    LABELED_FILESYSTEMS.contains(&fstype)
}

/// Parse `/proc/mounts` into (mount point, filesystem type) pairs.
pub fn parse_mounts(table: &str) -> Vec<(PathBuf, String)> {
    table
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let _device = fields.next()?;
            let mount_point = fields.next()?;
            let fstype = fields.next()?;
            Some((PathBuf::from(unescape_mount(mount_point)), fstype.to_string()))
        })
        .collect()
}

/// Filesystem type of the deepest mount point containing `path`.
pub fn filesystem_for<'a>(mounts: &'a [(PathBuf, String)], path: &Path) -> Option<&'a str> {
    mounts
        .iter()
        .filter(|(mount_point, _)| path.starts_with(mount_point))
        .max_by_key(|(mount_point, _)| mount_point.components().count())
        .map(|(_, fstype)| fstype.as_str())
}

/// `/proc/mounts` escapes space, tab, newline and backslash as `\ooo`.
fn unescape_mount(field: &str) -> String {
    let bytes = field.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\'
            && i + 3 < bytes.len()
            && bytes[i + 1..=i + 3].iter().all(|b| (b'0'..=b'7').contains(b))
        {
            let code = bytes[i + 1..=i + 3]
                .iter()
                .fold(0u32, |acc, b| acc * 8 + u32::from(b - b'0'));
            out.push(code as u8);
            i += 4;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Canonical form of the deepest existing ancestor of `path`.
fn resolve_existing(path: &Path) -> PathBuf {
    path.ancestors()
        .find_map(|p| p.canonicalize().ok())
        .unwrap_or_else(|| path.to_path_buf())
}

#[cfg(target_os = "linux")]
mod xattr {
    use super::SELINUX_XATTR;
    use std::ffi::CString;
    use std::io;
    use std::os::unix::ffi::OsStrExt;
    use std::path::Path;

    fn c_strings(path: &Path) -> io::Result<(CString, CString)> {
        let c_path = CString::new(path.as_os_str().as_bytes())?;
        let c_name = CString::new(SELINUX_XATTR)?;
        Ok((c_path, c_name))
    }

    /// Read the label without following a final symlink.
    pub fn get(path: &Path) -> io::Result<Option<String>> {
        let (c_path, c_name) = c_strings(path)?;

        let size =
            unsafe { libc::lgetxattr(c_path.as_ptr(), c_name.as_ptr(), std::ptr::null_mut(), 0) };
        if size < 0 {
            return absent_or_error(io::Error::last_os_error());
        }

        let mut buf = vec![0u8; size as usize];
        let read = unsafe {
            libc::lgetxattr(
                c_path.as_ptr(),
                c_name.as_ptr(),
                buf.as_mut_ptr().cast(),
                buf.len(),
            )
        };
        if read < 0 {
            return absent_or_error(io::Error::last_os_error());
        }
        buf.truncate(read as usize);
        while buf.last() == Some(&0) {
            buf.pop();
        }
        Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
    }

    pub fn set(path: &Path, label: &str) -> io::Result<()> {
        let (c_path, c_name) = c_strings(path)?;
        let value = CString::new(label)?;
        let bytes = value.as_bytes_with_nul();

        let rc = unsafe {
            libc::lsetxattr(
                c_path.as_ptr(),
                c_name.as_ptr(),
                bytes.as_ptr().cast(),
                bytes.len(),
                0,
            )
        };
        if rc != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    fn absent_or_error(err: io::Error) -> io::Result<Option<String>> {
        match err.raw_os_error() {
            Some(libc::ENODATA) | Some(libc::EOPNOTSUPP) => Ok(None),
            _ => Err(err),
        }
    }
}

#[cfg(not(target_os = "linux"))]
mod xattr {
    use std::io;
    use std::path::Path;

    pub fn get(_path: &Path) -> io::Result<Option<String>> {
        Ok(None)
    }

    pub fn set(_path: &Path, _label: &str) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "security labels are only supported on Linux",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_label() {
        let ctx = SecurityContext::parse("user_u:object_r:krb5_home_t:s0");
        assert_eq!(ctx, SecurityContext::new("user_u", "object_r", "krb5_home_t", "s0"));
        assert_eq!(ctx.to_string(), "user_u:object_r:krb5_home_t:s0");
    }

    #[test]
    fn test_parse_range_with_categories() {
        let ctx = SecurityContext::parse("unconfined_u:object_r:user_home_t:s0:c0.c1023");
        assert_eq!(ctx.get(ContextField::Range), Some("s0:c0.c1023"));
    }

    #[test]
    fn test_parse_without_range() {
        let ctx = SecurityContext::parse("system_u:object_r:etc_t\0");
        assert_eq!(ctx.get(ContextField::Type), Some("etc_t"));
        assert_eq!(ctx.get(ContextField::Range), None);
        assert_eq!(ctx.to_string(), "system_u:object_r:etc_t");
    }

    #[test]
    fn test_set_single_field() {
        let mut ctx = SecurityContext::new("user_u", "object_r", "krb5_home_t", "s0");
        ctx.set(ContextField::Type, "user_home_t");
        assert_eq!(ctx.to_string(), "user_u:object_r:user_home_t:s0");
    }

    #[test]
    fn test_builtin_defaults_for_k5login() {
        let defaults = DefaultContexts::builtin().default_for(ResourceKind::K5loginHome);
        assert_eq!(defaults.get(ContextField::User), Some("user_u"));
        assert_eq!(defaults.get(ContextField::Role), Some("object_r"));
        assert_eq!(defaults.get(ContextField::Type), Some("krb5_home_t"));
        assert_eq!(defaults.get(ContextField::Range), Some("s0"));
    }

    #[test]
    fn test_override_keeps_unset_fields() {
        let overrides = SecurityContext {
            user: Some("staff_u".to_string()),
            ..Default::default()
        };
        let defaults = DefaultContexts::builtin()
            .with_override(ResourceKind::K5loginHome, overrides)
            .default_for(ResourceKind::K5loginHome);
        assert_eq!(defaults.to_string(), "staff_u:object_r:krb5_home_t:s0");
    }

    #[test]
    fn test_no_context_backend() {
        let path = Path::new("/home/someone/.k5login");
        assert_eq!(ContextSupport::detect(&NoContext, path), ContextSupport::Unsupported);
        assert!(NoContext.get_context(path).unwrap().is_none());
        assert!(NoContext.set_context(path, &SecurityContext::default()).is_err());
    }

    #[test]
    fn test_filesystem_for_picks_deepest_mount() {
        let table = "\
/dev/sda1 / ext4 rw,relatime 0 0
proc /proc proc rw 0 0
server:/export /home nfs4 rw 0 0
/dev/sdb1 /home/local\\040disk xfs rw 0 0
";
        let mounts = parse_mounts(table);
        assert_eq!(filesystem_for(&mounts, Path::new("/etc/krb5.conf")), Some("ext4"));
        assert_eq!(filesystem_for(&mounts, Path::new("/home/alice/.k5login")), Some("nfs4"));
        assert_eq!(
            filesystem_for(&mounts, Path::new("/home/local disk/bob/.k5login")),
            Some("xfs")
        );
    }

    #[test]
    fn test_labeled_filesystems() {
        assert!(is_labeled_filesystem("ext4"));
        assert!(is_labeled_filesystem("tmpfs"));
        assert!(!is_labeled_filesystem("nfs4"));
        assert!(!is_labeled_filesystem("vfat"));
    }

    #[test]
    fn test_xattr_backend_without_selinuxfs() {
        let backend = XattrContext {
            selinuxfs: PathBuf::from("/nonexistent/selinuxfs"),
            mounts: PathBuf::from("/proc/mounts"),
        };
        assert!(!backend.supports_context(Path::new("/tmp")));
    }
}
