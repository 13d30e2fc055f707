//! Diff display - resource-level summary and line-level content diffs

use colored::Colorize;
use declarative::{DiffSummary, ResourceDiff, ResourceState, group_by_type};

use crate::resource::Fragment;

/// Display a list of diffs in a user-friendly format
pub fn display_diff(diffs: &[ResourceDiff]) {
    if diffs.is_empty() {
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

    for (resource_type, type_diffs) in group_by_type(diffs) {
        let type_name = match resource_type {
            "fragment" => "Fragments",
            "ssl_material" => "SSL material",
            _ => resource_type,
        };
        println!("│ {}", type_name.bold());

        for diff in type_diffs {
            let symbol = if diff.is_addition() {
                "+".green()
            } else if diff.is_removal() {
                "-".red()
            } else {
                "~".yellow()
            };

            let state_desc = match (&diff.current, &diff.desired) {
                (ResourceState::Absent, ResourceState::Present { .. }) => "(new)".to_string(),
                (ResourceState::Present { details: from }, ResourceState::Present { details: to }) => {
                    format!(
                        "{} → {}",
                        from.as_deref().unwrap_or("current"),
                        to.as_deref().unwrap_or("desired")
                    )
                }
                (ResourceState::Present { .. }, ResourceState::Absent) => {
                    "(will remove)".to_string()
                }
                _ => String::new(),
            };

            let notify = if diff.notifies {
                " [reload]".cyan().to_string()
            } else {
                String::new()
            };

            println!(
                "│   {} {:<50} {}{}",
                symbol,
                diff.resource_id,
                state_desc.dimmed(),
                notify
            );
        }
        println!("│");
    }

    let summary = DiffSummary::from_diffs(diffs);
    println!("├─────────────────────────────────────────────────────┤");
    println!(
        "│ Summary: {} changes ({} new, {} modified, {} removed, {} reload)",
        summary.total().to_string().bold(),
        summary.additions.to_string().green(),
        summary.modifications.to_string().yellow(),
        summary.removals.to_string().red(),
        summary.notifying.to_string().cyan()
    );
    println!("└─────────────────────────────────────────────────────┘");
}

/// Line changes between two texts, rendered with `+`/`-` prefixes
pub fn content_diff(current: &str, desired: &str) -> Vec<String> {
    let diff = similar::TextDiff::from_lines(current, desired);
    diff.iter_all_changes()
        .filter_map(|change| match change.tag() {
            similar::ChangeTag::Delete => Some(format!("- {}", change)),
            similar::ChangeTag::Insert => Some(format!("+ {}", change)),
            similar::ChangeTag::Equal => None,
        })
        .collect()
}

/// Print a unified-style content diff for one fragment
pub fn show_fragment_diff(fragment: &Fragment) {
    let current = match fragment.read_current() {
        Ok(bytes) => bytes.unwrap_or_default(),
        Err(e) => {
            println!("    {}", e.to_string().red());
            return;
        }
    };
    let desired = fragment.file.content.clone().unwrap_or_default();
    if current == desired {
        return;
    }

    println!();
    println!("  {}", fragment.path().display().to_string().bold());
    let (Ok(current), Ok(desired)) = (String::from_utf8(current), String::from_utf8(desired)) else {
        println!("    {}", "(binary content differs)".dimmed());
        return;
    };

    for line in content_diff(&current, &desired) {
        let colored = if line.starts_with('+') {
            line.green()
        } else {
            line.red()
        };
        print!("    {}", colored);
        if !line.ends_with('\n') {
            println!();
        }
    }
}
