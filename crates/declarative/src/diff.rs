//! Diff computation for resources

use crate::resource::Resource;
use crate::types::PropertyValue;
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// One property whose current value differs from the desired one
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyChange {
    /// Property name
    pub property: String,
    /// Current value
    pub current: PropertyValue,
    /// Desired value
    pub desired: PropertyValue,
}

/// A diff between current and desired state of a resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceDiff {
    /// Unique identifier of the resource
    pub resource_id: String,
    /// Type of the resource
    pub resource_type: String,
    /// Human-readable description
    pub description: String,
    /// Out-of-sync properties, `ensure` first when present
    pub changes: Vec<PropertyChange>,
}

impl ResourceDiff {
    /// Create a diff from a resource, returning None if no changes needed
    ///
    /// When `ensure` is out of sync it is the only change reported: creating
    /// or removing the resource subsumes every other property.
    pub fn from_resource(resource: &dyn Resource) -> Result<Option<Self>> {
        let mut changes = Vec::new();

        if let Some(ensure) = resource.ensure() {
            let current = ensure.retrieve()?;
            if !ensure.is_in_sync(&current) {
                changes.push(PropertyChange {
                    property: ensure.name().to_string(),
                    current,
                    desired: ensure.desired().unwrap_or(PropertyValue::Nil),
                });
            } else if current.is_absent() {
                return Ok(None);
            }
        }

        if changes.is_empty() {
            for property in resource.properties() {
                let current = property.retrieve()?;
                if property.is_in_sync(&current) {
                    continue;
                }
                changes.push(PropertyChange {
                    property: property.name().to_string(),
                    current,
                    desired: property.desired().unwrap_or(PropertyValue::Nil),
                });
            }
        }

        if changes.is_empty() {
            return Ok(None);
        }

        Ok(Some(Self {
            resource_id: resource.id(),
            resource_type: resource.resource_type().to_string(),
            description: resource.description(),
            changes,
        }))
    }

    fn ensure_change(&self) -> Option<&PropertyChange> {
        self.changes.iter().find(|c| c.property == "ensure")
    }

    /// Check if this diff represents an addition
    pub fn is_addition(&self) -> bool {
        self.ensure_change()
            .is_some_and(|c| c.current.is_absent() && c.desired == PropertyValue::Present)
    }

    /// Check if this diff represents a removal
    pub fn is_removal(&self) -> bool {
        self.ensure_change()
            .is_some_and(|c| c.current == PropertyValue::Present && c.desired.is_absent())
    }

    /// Check if this diff represents an in-place modification
    pub fn is_modification(&self) -> bool {
        self.ensure_change().is_none()
    }
}

/// A resource whose current state could not be read
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnreadableResource {
    /// Unique identifier of the resource
    pub resource_id: String,
    /// Why reading failed
    pub error: String,
}

/// Diffs of a set of resources, plus the ones that could not be read
#[derive(Debug, Clone, Default)]
pub struct DiffReport {
    /// Resources whose state differs from the desired one
    pub diffs: Vec<ResourceDiff>,
    /// Resources whose state is unknown; they may well be out of sync
    pub unreadable: Vec<UnreadableResource>,
}

impl DiffReport {
    /// Nothing differs and everything could be read
    pub fn is_empty(&self) -> bool {
        self.diffs.is_empty() && self.unreadable.is_empty()
    }

    /// Number of resources that need attention
    pub fn len(&self) -> usize {
        self.diffs.len() + self.unreadable.len()
    }
}

/// Compute diffs for a list of resources
///
/// Resources without differences are left out. A resource whose state
/// cannot be read is reported in [`DiffReport::unreadable`], never treated
/// as in sync.
pub fn compute_diffs(resources: &[Box<dyn Resource>]) -> DiffReport {
    let mut report = DiffReport::default();
    for resource in resources {
        match ResourceDiff::from_resource(resource.as_ref()) {
            Ok(Some(diff)) => report.diffs.push(diff),
            Ok(None) => {}
            Err(e) => {
                log::warn!("Could not read state of {}: {e:#}", resource.id());
                report.unreadable.push(UnreadableResource {
                    resource_id: resource.id(),
                    error: format!("{e:#}"),
                });
            }
        }
    }
    report
}

/// Diff summary statistics
#[derive(Debug, Clone, Default)]
pub struct DiffSummary {
    /// Number of resources to add
    pub additions: usize,
    /// Number of resources to remove
    pub removals: usize,
    /// Number of resources to modify
    pub modifications: usize,
}

impl DiffSummary {
    /// Create a summary from a list of diffs
    pub fn from_diffs(diffs: &[ResourceDiff]) -> Self {
        let mut summary = Self::default();
        for diff in diffs {
            if diff.is_addition() {
                summary.additions += 1;
            } else if diff.is_removal() {
                summary.removals += 1;
            } else {
                summary.modifications += 1;
            }
        }
        summary
    }

    /// Total number of changes
    pub fn total(&self) -> usize {
        self.additions + self.removals + self.modifications
    }
}
