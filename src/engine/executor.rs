//! Execution engine - vhostctl executor with UI integration

use anyhow::Result;
use colored::Colorize;
use declarative::{AutoConfirm, ConfirmCallback, ExecuteSummary, ExecutionPlan, compute_diffs};

use crate::progress::BarProgress;

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
    /// Hide the progress bar
    pub quiet: bool,
}

/// Confirmation through an interactive prompt
struct PromptConfirm;

impl ConfirmCallback for PromptConfirm {
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        use dialoguer::Confirm;

        let confirmed = Confirm::new()
            .with_prompt(prompt)
            .default(true)
            .interact()?;

        Ok(confirmed)
    }
}

/// Execute the plan with vhostctl's UI integration
pub fn execute(plan: ExecutionPlan, opts: &ExecuteOptions) -> Result<ExecuteSummary> {
    let diffs = compute_diffs(&plan.resources);
    display_diff(&diffs);

    if diffs.is_empty() {
        return Ok(ExecuteSummary::default());
    }

    if opts.dry_run {
        println!();
        println!("  {} Dry run - no changes made", "ℹ".blue());
        return Ok(ExecuteSummary::default());
    }

    let inner = declarative::ExecuteOptions {
        dry_run: false,
        verbose: opts.verbose,
    };
    let mut progress = BarProgress::new(opts.quiet);

    println!();
    let summary = if opts.yes {
        declarative::execute(plan, inner, &mut progress, &mut AutoConfirm)?
    } else {
        declarative::execute(plan, inner, &mut progress, &mut PromptConfirm)?
    };

    if summary.skipped == diffs.len() && summary.total_changes() == 0 && summary.failed == 0 {
        println!();
        println!("  {} Aborted", "✗".red());
        return Ok(summary);
    }

    print_summary(&summary);
    Ok(summary)
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
        println!("    • {} fragments created", summary.created);
    }
    if summary.modified > 0 {
        println!("    • {} fragments modified", summary.modified);
    }
    if summary.removed > 0 {
        println!("    • {} fragments removed", summary.removed);
    }
    if summary.skipped > 0 {
        println!("    • {} fragments skipped", summary.skipped);
    }
    if summary.notified > 0 {
        println!("    • nginx reloaded");
    }
    if summary.failed > 0 {
        println!("    • {} {} failed", summary.failed, "resources".red());
    }
}
