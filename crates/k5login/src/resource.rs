//! The k5login resource: one file, its declared state, and the per-pass
//! facts (label support, default label) needed to reconcile it.

use crate::error::{Error, Result};
use crate::format;
use crate::mode::Mode;
use crate::probe::{self, Snapshot};
use crate::property::{K5loginProperty, PropertyKind};
use crate::reconciler::{self, ContextWrite};
use crate::selinux::{
    ContextBackend, ContextField, ContextSupport, DefaultContexts, ResourceKind, SecurityContext,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

/// Whether the file should exist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ensure {
    #[default]
    Present,
    Absent,
}

impl fmt::Display for Ensure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Present => write!(f, "present"),
            Self::Absent => write!(f, "absent"),
        }
    }
}

impl FromStr for Ensure {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "present" => Ok(Self::Present),
            "absent" => Ok(Self::Absent),
            other => Err(format!("invalid ensure value {other:?}, expected present or absent")),
        }
    }
}

/// What the file should look like.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DesiredState {
    pub ensure: Ensure,
    /// `None` leaves an existing file's content alone; a new file is empty
    pub principals: Option<Vec<String>>,
    pub mode: Mode,
    /// Explicitly requested label fields; unset fields fall back to the
    /// default for the resource kind
    pub context: SecurityContext,
}

impl DesiredState {
    pub fn present(principals: Vec<String>) -> Self {
        Self {
            principals: Some(principals),
            ..Default::default()
        }
    }

    pub fn absent() -> Self {
        Self {
            ensure: Ensure::Absent,
            ..Default::default()
        }
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_context(mut self, context: SecurityContext) -> Self {
        self.context = context;
        self
    }
}

/// A `.k5login` file under management.
#[derive(Debug, Clone)]
pub struct K5login {
    path: PathBuf,
    desired: DesiredState,
    backend: Arc<dyn ContextBackend>,
    support: ContextSupport,
    default_context: SecurityContext,
}

impl K5login {
    /// Declare a resource, probing label support once for this pass.
    pub fn new(
        path: impl Into<PathBuf>,
        desired: DesiredState,
        backend: Arc<dyn ContextBackend>,
        defaults: &DefaultContexts,
    ) -> Result<Self> {
        let path = path.into();
        let support = ContextSupport::detect(backend.as_ref(), &path);
        Self::with_support(path, desired, backend, support, defaults)
    }

    /// Declare a resource with an already known label support.
    pub fn with_support(
        path: impl Into<PathBuf>,
        desired: DesiredState,
        backend: Arc<dyn ContextBackend>,
        support: ContextSupport,
        defaults: &DefaultContexts,
    ) -> Result<Self> {
        let path = path.into();
        if !path.is_absolute() {
            return Err(Error::InvalidPath(path));
        }
        if let Some(principals) = &desired.principals {
            format::validate(principals)?;
        }
        Ok(Self {
            path,
            desired,
            backend,
            support,
            default_context: defaults.default_for(ResourceKind::K5loginHome),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn desired(&self) -> &DesiredState {
        &self.desired
    }

    pub fn support(&self) -> ContextSupport {
        self.support
    }

    pub(crate) fn backend(&self) -> &dyn ContextBackend {
        self.backend.as_ref()
    }

    /// Wanted value of one label field: explicit, else the kind's default
    /// when labels are supported at all.
    pub fn desired_context_field(&self, field: ContextField) -> Option<&str> {
        self.desired.context.get(field).or_else(|| {
            self.support
                .is_supported()
                .then(|| self.default_context.get(field))
                .flatten()
        })
    }

    /// Descriptor for one property.
    pub fn property(&self, kind: PropertyKind) -> K5loginProperty<'_> {
        K5loginProperty::new(kind, self)
    }

    /// Current state of every property.
    pub fn snapshot(&self) -> Result<Snapshot> {
        Snapshot::take(&self.path, self.backend(), self.support)
    }

    // ------------------------------------------------------------------
    // Getters
    // ------------------------------------------------------------------

    pub fn exists(&self) -> bool {
        probe::exists(&self.path)
    }

    pub fn principals(&self) -> Result<Option<Vec<String>>> {
        probe::read_principals(&self.path)
    }

    pub fn mode(&self) -> Option<Mode> {
        probe::read_mode(&self.path)
    }

    pub fn context(&self) -> Result<SecurityContext> {
        probe::read_security_context(&self.path, self.backend(), self.support)
    }

    // ------------------------------------------------------------------
    // Mutators
    // ------------------------------------------------------------------

    /// Write the declared principals and mode to a new file.
    pub fn create(&self) -> Result<()> {
        let principals = self.desired.principals.clone().unwrap_or_default();
        reconciler::ensure_create(&self.path, &principals, self.desired.mode)
    }

    pub fn destroy(&self) -> Result<()> {
        reconciler::ensure_destroy(&self.path)
    }

    pub fn set_principals(&self, principals: &[String]) -> Result<()> {
        reconciler::set_principals(&self.path, principals)
    }

    pub fn set_mode(&self, octal: &str) -> Result<()> {
        reconciler::set_mode(&self.path, octal)
    }

    pub fn set_context_field(&self, field: ContextField, value: &str) -> Result<ContextWrite> {
        reconciler::set_context_field(&self.path, self.backend(), self.support, field, value)
    }
}

impl declarative::Resource for K5login {
    fn id(&self) -> String {
        self.path.display().to_string()
    }

    fn description(&self) -> String {
        match self.desired.ensure {
            Ensure::Present => format!("k5login {} (mode {})", self.path.display(), self.desired.mode),
            Ensure::Absent => format!("k5login {} (absent)", self.path.display()),
        }
    }

    fn resource_type(&self) -> &'static str {
        "k5login"
    }

    fn ensure(&self) -> Option<declarative::BoxedProperty<'_>> {
        Some(Box::new(self.property(PropertyKind::Ensure)))
    }

    fn properties(&self) -> Vec<declarative::BoxedProperty<'_>> {
        PropertyKind::ALL
            .into_iter()
            .filter(|kind| *kind != PropertyKind::Ensure)
            .map(|kind| Box::new(self.property(kind)) as declarative::BoxedProperty<'_>)
            .collect()
    }
}
