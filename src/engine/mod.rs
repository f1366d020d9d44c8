//! Execution engine for k5sync
//!
//! The engine orchestrates:
//! 1. Planning - Build one resource per declared file
//! 2. Diffing - Compute current vs desired state per property
//! 3. Executing - Reconcile each resource with terminal progress output

pub mod differ;
pub mod executor;

use anyhow::{Context, Result};
use declarative::ExecutionPlan;
use k5login::{ContextBackend, K5login, XattrContext};
use std::sync::Arc;

use crate::config::K5syncConfig;

pub use executor::{ExecuteOptions, execute};

/// Build one resource per declared file
///
/// Label support is probed once per resource here and then held fixed for
/// the rest of the pass.
pub fn build_resources(config: &K5syncConfig) -> Result<Vec<K5login>> {
    let backend: Arc<dyn ContextBackend> = Arc::new(XattrContext::new());
    let defaults = config.default_contexts();

    config
        .k5login
        .iter()
        .map(|entry| {
            let path = entry.expanded_path()?;
            let resource =
                K5login::new(&path, entry.desired_state(), Arc::clone(&backend), &defaults)
                    .with_context(|| format!("Invalid k5login entry {}", entry.path))?;
            log::debug!(
                "{}: security contexts {}",
                path.display(),
                if resource.support().is_supported() {
                    "supported"
                } else {
                    "not supported"
                }
            );
            Ok(resource)
        })
        .collect()
}

/// Build the execution plan, optionally narrowed to a target
pub fn build_plan(config: &K5syncConfig, target: Option<&str>) -> Result<ExecutionPlan> {
    let mut plan = ExecutionPlan::new();
    for resource in build_resources(config)? {
        plan.add_resource(Box::new(resource));
    }
    Ok(plan.filter_by_target(target))
}
