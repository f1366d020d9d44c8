//! Diff display - k5sync-specific UI

use colored::Colorize;
use declarative::{DiffReport, DiffSummary, PropertyChange, PropertyValue};

/// Display a diff report in a user-friendly format
pub fn display_diff(report: &DiffReport) {
    if report.is_empty() {
        println!();
        println!("  {} No changes needed", "✓".green());
        return;
    }

    println!();
    println!(
        "┌─ {} ─────────────────────────────────────────┐",
        "Configuration Diff".bold()
    );
    println!("│");

    for diff in &report.diffs {
        let symbol = if diff.is_addition() {
            "+".green()
        } else if diff.is_removal() {
            "-".red()
        } else {
            "~".yellow()
        };
        println!("│ {} {}", symbol, diff.resource_id.bold());

        for change in &diff.changes {
            display_change(change);
        }
        println!("│");
    }

    for unreadable in &report.unreadable {
        println!("│ {} {}", "✗".red(), unreadable.resource_id.bold());
        println!("│     {}", unreadable.error.red());
        println!("│");
    }

    let summary = DiffSummary::from_diffs(&report.diffs);
    println!("├─────────────────────────────────────────────────────┤");
    println!(
        "│ Summary: {} files ({} to create, {} to remove, {} to modify)",
        summary.total().to_string().bold(),
        summary.additions.to_string().green(),
        summary.removals.to_string().red(),
        summary.modifications.to_string().yellow()
    );
    if !report.unreadable.is_empty() {
        println!(
            "│ {} files could not be read",
            report.unreadable.len().to_string().red()
        );
    }
    println!("└─────────────────────────────────────────────────────┘");
}

fn display_change(change: &PropertyChange) {
    match (&change.current, &change.desired) {
        (PropertyValue::List(current), PropertyValue::List(desired)) => {
            println!("│     {}", change.property.dimmed());
            for line in principal_diff(current, desired) {
                println!("│       {line}");
            }
        }
        (current, desired) => {
            println!(
                "│     {:<12} {} → {}",
                change.property.dimmed(),
                current.to_string().red(),
                desired.to_string().green()
            );
        }
    }
}

/// Line diff of two principal lists, one rendered line per change
pub fn principal_diff(current: &[String], desired: &[String]) -> Vec<String> {
    let old = k5login::format::render(current);
    let new = k5login::format::render(desired);
    let diff = similar::TextDiff::from_lines(&old, &new);

    diff.iter_all_changes()
        .filter_map(|change| {
            let line = change.value().trim_end_matches('\n');
            match change.tag() {
                similar::ChangeTag::Delete => Some(format!("- {line}").red().to_string()),
                similar::ChangeTag::Insert => Some(format!("+ {line}").green().to_string()),
                similar::ChangeTag::Equal => None,
            }
        })
        .collect()
}
