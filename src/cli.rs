use clap::{Parser, Subcommand};
use clap_complete::Shell;
use nginxkit::FragmentKind;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "vhostctl")]
#[command(version)]
#[command(about = "Compose and converge nginx virtual host fragments", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Manifest path (default: $VHOSTCTL_CONFIG_DIR/vhosts.toml)
    #[arg(short, long, global = true, env = "VHOSTCTL_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Validate every vhost in the manifest
    Check,

    /// Show the fragments each vhost produces
    Plan(PlanArgs),

    /// Print rendered fragment contents for one vhost
    Render(RenderArgs),

    /// Preview what apply would change
    Diff(TargetArgs),

    /// Write fragments and reload nginx when needed
    Apply(ApplyArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser)]
pub struct TargetArgs {
    /// Only this vhost
    pub target: Option<String>,
}

#[derive(Parser)]
pub struct PlanArgs {
    /// Only this vhost
    pub target: Option<String>,

    /// Print the plan as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser)]
pub struct RenderArgs {
    /// Vhost name
    pub vhost: String,

    /// Only this fragment (header, default-location, footer, ssl-header, ...)
    #[arg(short, long, value_parser = parse_kind)]
    pub kind: Option<FragmentKind>,
}

#[derive(Parser)]
pub struct ApplyArgs {
    /// Only this vhost
    pub target: Option<String>,

    /// Dry run - show what would change
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

fn parse_kind(s: &str) -> Result<FragmentKind, String> {
    s.parse()
}
