//! Execution engine - reconciles resources property by property
//!
//! A pass over one resource:
//! 1. `ensure` is checked first. If it needs to change it is synced alone;
//!    after a removal (or in a dry run) nothing else is touched.
//! 2. Every other property is re-read, compared and synced if out of sync.
//! 3. The first failure ends the pass for that resource.
//!
//! Everything runs sequentially on the calling thread.

use crate::context::{ApplyContext, ConfirmCallback, ProgressCallback};
use crate::diff::compute_diffs;
use crate::planner::ExecutionPlan;
use crate::resource::{Property, Resource};
use crate::types::{ApplyResult, ExecuteOptions, ExecuteSummary, PropertyEvent, PropertyValue};
use anyhow::Result;

/// Execute a plan with the given options and callbacks
///
/// # Arguments
/// * `plan` - The execution plan to run
/// * `opts` - Execution options (dry_run, verbose)
/// * `progress` - Progress callback
/// * `confirm` - Confirmation callback
///
/// # Returns
/// Summary of execution results
pub fn execute<P, C>(
    plan: ExecutionPlan,
    opts: ExecuteOptions,
    progress: &mut P,
    confirm: &mut C,
) -> Result<ExecuteSummary>
where
    P: ProgressCallback,
    C: ConfirmCallback,
{
    let report = compute_diffs(&plan.resources);
    if report.is_empty() {
        log::info!("All {} resources in sync", plan.total_resources());
        return Ok(ExecuteSummary::default());
    }

    // Confirm before proceeding (unless dry_run)
    if !opts.dry_run && !confirm.confirm("Apply changes?")? {
        return Ok(ExecuteSummary {
            skipped: report.len(),
            ..Default::default()
        });
    }

    let mut summary = ExecuteSummary::default();
    let mut ctx = ApplyContext::new(opts.dry_run, opts.verbose);

    for resource in &plan.resources {
        let id = resource.id();
        progress.on_resource_start(&id, &resource.description());

        let events = reconcile(resource.as_ref(), &mut ctx);
        let mut resource_summary = ExecuteSummary::default();
        for event in &events {
            progress.on_event(&id, event);
            resource_summary.add_result(&event.result);
        }

        progress.on_resource_complete(&id, &resource_summary);
        summary.merge(&resource_summary);
    }

    Ok(summary)
}

/// Run one reconciliation pass over a resource
///
/// Returns one event per property examined, in the order they were handled.
pub fn reconcile(resource: &dyn Resource, ctx: &mut ApplyContext) -> Vec<PropertyEvent> {
    let id = resource.id();
    let mut events = Vec::new();

    if let Some(ensure) = resource.ensure() {
        let event = evaluate(&id, ensure.as_ref(), ctx);
        let changed = event.result != ApplyResult::NoChange;
        let stop = !event.result.is_success()
            || (changed && ctx.dry_run)
            || (changed && ensure.desired().as_ref().is_some_and(PropertyValue::is_absent))
            || (!changed && event.previous.is_absent());
        events.push(event);
        if stop {
            return events;
        }
    }

    for property in resource.properties() {
        let event = evaluate(&id, property.as_ref(), ctx);
        let failed = !event.result.is_success();
        events.push(event);
        if failed {
            break;
        }
    }

    events
}

/// Compare one property and sync it if needed
fn evaluate(id: &str, property: &dyn Property, ctx: &mut ApplyContext) -> PropertyEvent {
    let name = property.name();
    let desired = property.desired().unwrap_or(PropertyValue::Nil);

    let previous = match property.retrieve() {
        Ok(value) => value,
        Err(e) => {
            log::warn!("{id}: could not read {name}: {e:#}");
            return PropertyEvent {
                property: name.to_string(),
                previous: PropertyValue::Nil,
                desired,
                result: ApplyResult::Failed {
                    error: format!("{e:#}"),
                },
            };
        }
    };

    let result = if property.is_in_sync(&previous) {
        if ctx.verbose {
            log::info!("{id}: {name} in sync ({previous})");
        } else {
            log::debug!("{id}: {name} in sync ({previous})");
        }
        ApplyResult::NoChange
    } else if ctx.dry_run {
        log::info!("{id}: {name} would change: {previous} -> {desired}");
        ApplyResult::Skipped {
            reason: "Dry run".into(),
        }
    } else {
        log::info!("{id}: {name} {previous} -> {desired}");
        match property.sync(ctx) {
            Ok(result) => result,
            Err(e) => {
                log::warn!("{id}: syncing {name} failed: {e:#}");
                ApplyResult::Failed {
                    error: format!("{e:#}"),
                }
            }
        }
    };

    PropertyEvent {
        property: name.to_string(),
        previous,
        desired,
        result,
    }
}

/// Simple execution without callbacks
///
/// For basic use cases where you don't need progress or confirmation.
pub fn execute_simple(plan: ExecutionPlan, opts: ExecuteOptions) -> Result<ExecuteSummary> {
    use crate::context::{AutoConfirm, NoProgress};

    execute(plan, opts, &mut NoProgress, &mut AutoConfirm)
}
