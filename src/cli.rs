//! CLI argument parsing via `clap`.

use clap::{ArgAction, Parser};

#[derive(Parser, Debug)]
#[command(
    name = "basefix",
    version,
    about = "Ensure classes implementing a capability interface derive from the platform base type",
    long_about = "basefix — scan a C# solution or project for classes that implement a capability interface \
(IBqlTable by default) without deriving from the required base type (PX.Data.PXBqlTable), report them, \
and optionally insert the base type.\n\nConfiguration precedence: CLI > basefix.toml > defaults.",
    after_help = "Examples:\n  basefix\n  basefix MySolution.sln --report reports/\n  basefix src/App/App.csproj --apply-changes\n  basefix --output json --report out/basefix.json"
)]
/// Command-line options for a single run.
pub struct Cli {
    #[arg(
        value_name = "WORKSPACE",
        help = "Solution (.sln/.slnf), project (.csproj) or directory to search (default: current dir)"
    )]
    pub workspace: Option<String>,
    #[arg(
        short = 'r',
        long,
        value_name = "PATH",
        help = "Report destination: a .json file, or a directory (default: current dir)"
    )]
    pub report: Option<String>,
    #[arg(long = "apply-changes", help = "Rewrite files instead of only reporting")]
    pub apply_changes: bool,
    #[arg(long, help = "Capability interface to look for (default: IBqlTable)")]
    pub capability: Option<String>,
    #[arg(long, help = "Required base type to insert (default: PX.Data.PXBqlTable)")]
    pub base_type: Option<String>,
    #[arg(
        long,
        help = "Only process projects referencing this assembly/package (default: PX.Data)"
    )]
    pub platform_reference: Option<String>,
    #[arg(long, help = "Output mode: human|json (default: human)")]
    pub output: Option<String>,
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, help = "More log output (-v debug, -vv trace)")]
    pub verbose: u8,
}

impl Cli {
    /// Flags the user actually passed, as config overrides.
    pub fn overrides(&self) -> crate::config::CliOverrides {
        crate::config::CliOverrides {
            workspace: self.workspace.clone(),
            report: self.report.clone(),
            apply: if self.apply_changes { Some(true) } else { None },
            capability: self.capability.clone(),
            base_type: self.base_type.clone(),
            platform_reference: self.platform_reference.clone(),
            output: self.output.clone(),
        }
    }
}
