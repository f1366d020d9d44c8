//! Execution engine - k5sync-specific executor with UI integration

use anyhow::Result;
use colored::Colorize;
use declarative::{
    ApplyResult, AutoConfirm, ConfirmCallback, ExecuteSummary, ExecutionPlan, ProgressCallback,
    PropertyEvent, compute_diffs,
};

use super::differ::display_diff;

/// Options for execution (adds `yes` for confirmation skip)
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    /// Don't make changes, just show what would happen
    pub dry_run: bool,
    /// Skip confirmation prompts
    pub yes: bool,
    /// Verbose output
    pub verbose: bool,
}

/// Execute the plan with k5sync's UI integration
pub fn execute(plan: ExecutionPlan, opts: ExecuteOptions) -> Result<ExecuteSummary> {
    let report = compute_diffs(&plan.resources);
    display_diff(&report);

    if report.is_empty() {
        return Ok(ExecuteSummary::default());
    }

    let run_opts = declarative::ExecuteOptions {
        dry_run: opts.dry_run,
        verbose: opts.verbose,
    };
    let mut progress = TerminalProgress {
        verbose: opts.verbose,
    };

    println!();
    let summary = if opts.yes {
        declarative::execute(plan, run_opts, &mut progress, &mut AutoConfirm)?
    } else {
        declarative::execute(plan, run_opts, &mut progress, &mut DialoguerConfirm)?
    };

    if opts.dry_run {
        println!();
        println!("  {} Dry run - no changes made", "ℹ".blue());
    } else if summary.total() == summary.skipped && summary.skipped > 0 {
        println!();
        println!("  {} Aborted", "✗".red());
    } else {
        print_summary(&summary);
    }

    Ok(summary)
}

/// Prints one line per property that did something
struct TerminalProgress {
    verbose: bool,
}

impl ProgressCallback for TerminalProgress {
    fn on_resource_start(&mut self, _id: &str, description: &str) {
        println!("  {} {}", "→".cyan(), description);
    }

    fn on_event(&mut self, _id: &str, event: &PropertyEvent) {
        let symbol = match &event.result {
            ApplyResult::NoChange | ApplyResult::NoOp { .. } => {
                if !self.verbose {
                    return;
                }
                "○".dimmed()
            }
            ApplyResult::Created | ApplyResult::Modified | ApplyResult::Removed => "✓".green(),
            ApplyResult::Failed { .. } => "✗".red(),
            ApplyResult::Skipped { .. } => "⊘".yellow(),
        };

        let detail = match &event.result {
            ApplyResult::Created => "created".to_string(),
            ApplyResult::Removed => "removed".to_string(),
            ApplyResult::Failed { error } => error.red().to_string(),
            ApplyResult::Skipped { reason } | ApplyResult::NoOp { reason } => {
                reason.dimmed().to_string()
            }
            ApplyResult::NoChange | ApplyResult::Modified => {
                format!("{} → {}", event.previous, event.desired)
            }
        };

        println!("    {} {:<12} {}", symbol, event.property, detail);
    }

    fn on_resource_complete(&mut self, id: &str, summary: &ExecuteSummary) {
        log::debug!(
            "{id}: {} changed, {} failed",
            summary.total_changes(),
            summary.failed
        );
    }
}

/// Confirm with user
struct DialoguerConfirm;

impl ConfirmCallback for DialoguerConfirm {
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        use dialoguer::Confirm;

        let confirmed = Confirm::new()
            .with_prompt(prompt)
            .default(true)
            .interact()?;

        Ok(confirmed)
    }
}

/// Print final summary
fn print_summary(summary: &ExecuteSummary) {
    println!();
    if summary.is_success() {
        println!(
            "  {} Configuration applied successfully!",
            "✓".green().bold()
        );
    } else {
        println!(
            "  {} Configuration applied with errors",
            "⚠".yellow().bold()
        );
    }

    if summary.created > 0 {
        println!("    • {} files created", summary.created);
    }
    if summary.modified > 0 {
        println!("    • {} properties modified", summary.modified);
    }
    if summary.removed > 0 {
        println!("    • {} files removed", summary.removed);
    }
    if summary.skipped > 0 {
        println!("    • {} properties skipped", summary.skipped);
    }
    if summary.failed > 0 {
        println!("    • {} {} failed", summary.failed, "properties".red());
    }
}
