//! basefix CLI binary entry point.
//! Resolves configuration, runs the fixer and prints results.

use basefix::cli::Cli;
use basefix::fix::{run_fix, FixOptions};
use basefix::resolver::ResolverOptions;
use basefix::rewrite::{Mode, RewriteRule};
use basefix::syntax::Toolchain;
use basefix::{config, logging, output, report, utils, workspace, Error};
use clap::Parser;
use std::path::PathBuf;

fn fail(err: &Error) -> ! {
    eprintln!("{} {}", utils::error_prefix(), err);
    std::process::exit(err.exit_code());
}

fn main() {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    let eff = config::resolve_effective(&cli.overrides());
    match &eff.config_file {
        Some(path) => tracing::debug!("Using config {}", path.display()),
        None if eff.output != "json" => eprintln!(
            "{} No basefix.toml found; using defaults.",
            utils::note_prefix()
        ),
        None => {}
    }

    let toolchain = Toolchain::discover().unwrap_or_else(|e| fail(&e));

    let ws_file = workspace::locate(eff.workspace.as_deref()).unwrap_or_else(|e| fail(&e));
    tracing::info!("Loading workspace {}", ws_file.path.display());
    let ws = workspace::load(&ws_file).unwrap_or_else(|e| fail(&e));

    let opts = FixOptions {
        rule: RewriteRule::new(&eff.capability, eff.base_type.clone()),
        mode: if eff.apply { Mode::Apply } else { Mode::Detect },
        platform_reference: eff.platform_reference.clone(),
        resolver: ResolverOptions {
            interfaces: eff.resolver_interfaces.clone(),
            classes: eff.resolver_classes.clone(),
            transitive: eff.resolver_transitive,
        },
    };
    let run = run_fix(&ws, &toolchain, &opts).unwrap_or_else(|e| fail(&e));

    let base = ws_file
        .path
        .parent()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    output::print_summary(&run, &eff.output, &base);

    if let Err(e) = report::write_report(&eff.report, &eff.report_prefix, &run.files) {
        fail(&e);
    }
}
