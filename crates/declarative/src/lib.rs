//! # Declarative
//!
//! A framework for declarative, property-level resource management.
//!
//! This crate provides the core abstractions for declaring desired state,
//! detecting current state, and converging systems to match it one property
//! at a time.
//!
//! ## Core Concepts
//!
//! - **Property**: One managed attribute with `retrieve`, `desired`,
//!   `is_in_sync` and `sync`
//! - **Resource**: A named bundle of properties, optionally with an
//!   `ensure` property governing existence
//! - **ResourceDiff**: The out-of-sync properties of a resource
//! - **Executor**: Reconciles resources in order, producing one
//!   [`PropertyEvent`] per property
//!
//! ## Example
//!
//! ```ignore
//! use declarative::{ExecutionPlan, ExecuteOptions, execute_simple};
//!
//! let mut plan = ExecutionPlan::new();
//! plan.add_resource(Box::new(my_resource));
//!
//! let summary = execute_simple(plan, ExecuteOptions::default())?;
//! println!("{} changes", summary.total_changes());
//! ```
//!
//! ## Callback Traits
//!
//! - [`ProgressCallback`]: Receives progress updates
//! - [`ConfirmCallback`]: Handles user confirmations
//!
//! This allows the crate to be used without hard dependencies on
//! specific UI frameworks.

pub mod context;
pub mod diff;
pub mod executor;
pub mod planner;
pub mod resource;
pub mod types;

// Re-export main types at crate root
pub use context::{
    ApplyContext, AutoConfirm, AutoDecline, ConfirmCallback, NoProgress, ProgressCallback,
};
pub use diff::{
    DiffReport, DiffSummary, PropertyChange, ResourceDiff, UnreadableResource, compute_diffs,
};
pub use executor::{execute, execute_simple, reconcile};
pub use planner::ExecutionPlan;
pub use resource::{BoxedProperty, BoxedResource, Property, Resource};
pub use types::{
    ApplyResult, ExecuteOptions, ExecuteSummary, PropertyEvent, PropertyValue, ResourceState,
};
