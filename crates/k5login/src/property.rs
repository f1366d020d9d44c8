//! The seven properties of a k5login resource as a closed set of tagged
//! descriptors, each exposing the same get / is-in-sync / set interface.

use crate::mode::{self, Mode};
use crate::reconciler::ContextWrite;
use crate::resource::{Ensure, K5login};
use crate::selinux::ContextField;
use anyhow::Result;
use declarative::{ApplyContext, ApplyResult, Property, PropertyValue};
use std::fmt;

/// Which property a descriptor manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyKind {
    Ensure,
    Principals,
    Mode,
    Context(ContextField),
}

impl PropertyKind {
    /// Sync order: existence first, then content, permissions and labels
    pub const ALL: [PropertyKind; 7] = [
        Self::Ensure,
        Self::Principals,
        Self::Mode,
        Self::Context(ContextField::User),
        Self::Context(ContextField::Role),
        Self::Context(ContextField::Type),
        Self::Context(ContextField::Range),
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Ensure => "ensure",
            Self::Principals => "principals",
            Self::Mode => "mode",
            Self::Context(field) => field.attribute(),
        }
    }
}

impl fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One property of one resource.
#[derive(Debug, Clone, Copy)]
pub struct K5loginProperty<'a> {
    kind: PropertyKind,
    resource: &'a K5login,
}

impl<'a> K5loginProperty<'a> {
    pub fn new(kind: PropertyKind, resource: &'a K5login) -> Self {
        Self { kind, resource }
    }

    pub fn kind(&self) -> PropertyKind {
        self.kind
    }

    fn wants_absent(&self) -> bool {
        self.resource.desired().ensure == Ensure::Absent
    }
}

impl Property for K5loginProperty<'_> {
    fn name(&self) -> &'static str {
        self.kind.name()
    }

    fn retrieve(&self) -> Result<PropertyValue> {
        let resource = self.resource;
        let value = match self.kind {
            PropertyKind::Ensure => {
                if resource.exists() {
                    PropertyValue::Present
                } else {
                    PropertyValue::Absent
                }
            }
            PropertyKind::Principals => match resource.principals()? {
                Some(list) => PropertyValue::List(list),
                None => PropertyValue::Absent,
            },
            PropertyKind::Mode => match resource.mode() {
                Some(mode) => PropertyValue::Text(mode.to_string()),
                None => PropertyValue::Absent,
            },
            PropertyKind::Context(field) => {
                if !resource.support().is_supported() {
                    PropertyValue::Nil
                } else if !resource.exists() {
                    PropertyValue::Absent
                } else {
                    match resource.context()?.get(field) {
                        Some(value) => PropertyValue::text(value),
                        None => PropertyValue::Nil,
                    }
                }
            }
        };
        Ok(value)
    }

    fn desired(&self) -> Option<PropertyValue> {
        let desired = self.resource.desired();
        match self.kind {
            PropertyKind::Ensure => Some(match desired.ensure {
                Ensure::Present => PropertyValue::Present,
                Ensure::Absent => PropertyValue::Absent,
            }),
            PropertyKind::Principals => desired.principals.clone().map(PropertyValue::List),
            PropertyKind::Mode => Some(PropertyValue::Text(desired.mode.to_string())),
            PropertyKind::Context(field) => self
                .resource
                .desired_context_field(field)
                .map(PropertyValue::text),
        }
    }

    fn is_in_sync(&self, current: &PropertyValue) -> bool {
        if self.kind != PropertyKind::Ensure && self.wants_absent() {
            return true;
        }
        match self.kind {
            PropertyKind::Mode => match current {
                PropertyValue::Text(s) => Mode::parse(s).is_ok_and(|current| {
                    mode::current_mode_equals_desired(current, self.resource.desired().mode)
                }),
                _ => false,
            },
            PropertyKind::Context(_) if !self.resource.support().is_supported() => true,
            _ => match self.desired() {
                None => true,
                Some(desired) => *current == desired,
            },
        }
    }

    fn sync(&self, _ctx: &mut ApplyContext) -> Result<ApplyResult> {
        let resource = self.resource;
        let result = match self.kind {
            PropertyKind::Ensure => match resource.desired().ensure {
                Ensure::Present => {
                    resource.create()?;
                    ApplyResult::Created
                }
                Ensure::Absent => {
                    resource.destroy()?;
                    ApplyResult::Removed
                }
            },
            PropertyKind::Principals => match &resource.desired().principals {
                Some(principals) => {
                    resource.set_principals(principals)?;
                    ApplyResult::Modified
                }
                None => ApplyResult::NoChange,
            },
            PropertyKind::Mode => {
                resource.set_mode(&resource.desired().mode.to_string())?;
                ApplyResult::Modified
            }
            PropertyKind::Context(field) => match resource.desired_context_field(field) {
                Some(value) => match resource.set_context_field(field, value)? {
                    ContextWrite::Applied => ApplyResult::Modified,
                    ContextWrite::NoOp => ApplyResult::NoOp {
                        reason: format!("{} unchanged or unsupported", field.attribute()),
                    },
                },
                None => ApplyResult::NoChange,
            },
        };
        Ok(result)
    }
}
