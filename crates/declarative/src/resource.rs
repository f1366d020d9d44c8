//! Resource and property traits for declarative state management
//!
//! A Resource is a bundle of independently managed properties. Each
//! property knows how to read its current value, what value is wanted, and
//! how to converge one to the other.

use crate::context::ApplyContext;
use crate::types::{ApplyResult, PropertyValue, ResourceState};
use anyhow::Result;
use std::fmt;

/// A single managed attribute of a resource
///
/// # Example
///
/// ```ignore
/// use declarative::{ApplyContext, ApplyResult, Property, PropertyValue};
///
/// #[derive(Debug)]
/// struct Motd<'a> { path: &'a str, text: &'a str }
///
/// impl Property for Motd<'_> {
///     fn name(&self) -> &'static str { "content" }
///
///     fn retrieve(&self) -> anyhow::Result<PropertyValue> {
///         match std::fs::read_to_string(self.path) {
///             Ok(s) => Ok(PropertyValue::Text(s)),
///             Err(_) => Ok(PropertyValue::Absent),
///         }
///     }
///
///     fn desired(&self) -> Option<PropertyValue> {
///         Some(PropertyValue::text(self.text))
///     }
///
///     fn sync(&self, _ctx: &mut ApplyContext) -> anyhow::Result<ApplyResult> {
///         std::fs::write(self.path, self.text)?;
///         Ok(ApplyResult::Modified)
///     }
/// }
/// ```
pub trait Property: fmt::Debug {
    /// Attribute name, unique within its resource
    fn name(&self) -> &'static str;

    /// Read the current value from the system
    fn retrieve(&self) -> Result<PropertyValue>;

    /// The wanted value, `None` when the property is not managed
    fn desired(&self) -> Option<PropertyValue>;

    /// Whether `current` already satisfies the desired value
    ///
    /// Default implementation is plain equality; unmanaged properties are
    /// always in sync.
    fn is_in_sync(&self, current: &PropertyValue) -> bool {
        match self.desired() {
            None => true,
            Some(desired) => *current == desired,
        }
    }

    /// Converge to the desired value
    ///
    /// Only called when [`Property::is_in_sync`] returned false and the pass
    /// is not a dry run.
    fn sync(&self, ctx: &mut ApplyContext) -> Result<ApplyResult>;
}

/// A boxed property borrowing its resource
pub type BoxedProperty<'a> = Box<dyn Property + 'a>;

/// Core trait for declarative resources
pub trait Resource: Send + Sync + fmt::Debug {
    /// Unique identifier for this resource
    ///
    /// This should be stable and uniquely identify the resource
    /// within its type, e.g. "/home/alice/.k5login" for a k5login file.
    fn id(&self) -> String;

    /// Human-readable description of what this resource does
    fn description(&self) -> String;

    /// Resource type category, used for grouping and filtering
    fn resource_type(&self) -> &'static str;

    /// The existence property, synced before anything else
    ///
    /// Resources without an existence notion return `None`.
    fn ensure(&self) -> Option<BoxedProperty<'_>> {
        None
    }

    /// Every other managed property, in sync order
    fn properties(&self) -> Vec<BoxedProperty<'_>>;

    /// Detect the current state of this resource as a whole
    fn current_state(&self) -> Result<ResourceState> {
        match self.ensure() {
            None => Ok(ResourceState::Unknown),
            Some(ensure) => Ok(match ensure.retrieve()? {
                PropertyValue::Absent => ResourceState::Absent,
                _ => ResourceState::Present { details: None },
            }),
        }
    }

    /// Check if any property needs changes to reach desired state
    fn needs_apply(&self) -> Result<bool> {
        if let Some(ensure) = self.ensure() {
            let current = ensure.retrieve()?;
            if !ensure.is_in_sync(&current) {
                return Ok(true);
            }
            if current.is_absent() {
                return Ok(false);
            }
        }
        for property in self.properties() {
            if !property.is_in_sync(&property.retrieve()?) {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

/// A boxed resource for type-erased storage
pub type BoxedResource = Box<dyn Resource>;
