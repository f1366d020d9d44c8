//! Declarative commands
//!
//! - `status` - Show current state vs desired state
//! - `diff` - Preview what apply would change
//! - `apply` - Make current state match desired state

use anyhow::{Result, bail};
use colored::Colorize;
use declarative::{
    ExecutionPlan, Property, PropertyValue, Resource, ResourceState, compute_diffs,
};

use crate::Context;
use crate::config::K5syncConfig;
use crate::engine::{self, ExecuteOptions, differ};
use crate::{paths, ui};

fn load_plan(ctx: &Context, target: Option<&str>) -> Result<ExecutionPlan> {
    let path = paths::config_file(ctx.config.as_deref())?;
    log::info!("Loading {}", path.display());
    let config = K5syncConfig::load(&path)?;

    let plan = engine::build_plan(&config, target)?;
    if plan.is_empty() && !ctx.quiet {
        match target {
            Some(t) => ui::warn(&format!("No declared files match '{t}'")),
            None => ui::warn(&format!("No k5login files declared in {}", path.display())),
        }
    }
    Ok(plan)
}

pub fn status(ctx: &Context, target: Option<&str>) -> Result<()> {
    ui::header("k5login Status");

    let plan = load_plan(ctx, target)?;
    for resource in &plan.resources {
        show_resource_status(resource.as_ref(), ctx);
    }

    Ok(())
}

fn show_resource_status(resource: &dyn Resource, ctx: &Context) {
    ui::section(&resource.id());

    let drift = match resource.needs_apply() {
        Ok(true) => "drifted".yellow(),
        Ok(false) => "in sync".green(),
        Err(e) => format!("unreadable: {e:#}").red(),
    };
    println!("  {:<14} {}", "state".dimmed(), drift);

    let properties = match resource.current_state() {
        Ok(ResourceState::Absent) => resource.ensure().into_iter().collect(),
        _ => {
            let mut all: Vec<_> = resource.ensure().into_iter().collect();
            all.extend(resource.properties());
            all
        }
    };

    for property in properties {
        match property.retrieve() {
            Ok(current) => show_property(property.as_ref(), &current, ctx),
            Err(e) => println!(
                "  {} {:<12} {}",
                "✗".red(),
                property.name(),
                format!("{e:#}").red()
            ),
        }
    }
}

fn show_property(property: &dyn Property, current: &PropertyValue, ctx: &Context) {
    if current.is_nil() && ctx.verbose == 0 {
        return;
    }
    let (symbol, wanted) = if property.is_in_sync(current) {
        ("✓".green(), String::new())
    } else {
        let desired = property.desired().unwrap_or(PropertyValue::Nil);
        ("~".yellow(), format!(" (want {desired})").yellow().to_string())
    };
    println!("  {} {:<12} {}{}", symbol, property.name().dimmed(), current, wanted);
}

pub fn diff(ctx: &Context, target: Option<&str>) -> Result<()> {
    ui::header("k5login Diff");

    let plan = load_plan(ctx, target)?;
    let report = compute_diffs(&plan.resources);
    differ::display_diff(&report);

    Ok(())
}

pub fn apply(ctx: &Context, target: Option<&str>, dry_run: bool, yes: bool) -> Result<()> {
    ui::header("Applying Configuration");

    if dry_run {
        ui::warn("Dry run - no changes will be made");
    }

    let plan = load_plan(ctx, target)?;
    let summary = engine::execute(
        plan,
        ExecuteOptions {
            dry_run,
            yes,
            verbose: ctx.verbose > 0,
        },
    )?;

    if !summary.is_success() {
        bail!("{} properties failed to converge", summary.failed);
    }
    Ok(())
}
