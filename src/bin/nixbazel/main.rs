//! nixbazel CLI - Nix store paths as Bazel dependencies

use std::io::IsTerminal;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};
use nixbazel::resolver::ResolveError;
use nixbazel::util::diagnostic;
use nixbazel::util::GlobalContext;

fn main() {
    // Parse CLI
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("nixbazel=debug")
    } else {
        EnvFilter::new("nixbazel=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let color = !cli.no_color && std::io::stderr().is_terminal();

    if let Err(e) = run(cli, color) {
        report(&e, color);
        std::process::exit(1);
    }
}

fn run(cli: Cli, color: bool) -> Result<()> {
    let mut ctx = GlobalContext::new()?;
    ctx.set_verbose(cli.verbose);
    ctx.set_color(color);

    // Execute command
    match cli.command {
        Commands::Resolve(args) => commands::resolve::execute(args, &ctx),
        Commands::Fetch(args) => commands::fetch::execute(args, &ctx),
        Commands::Generate(args) => commands::generate::execute(args, &ctx),
        Commands::Unpack(args) => commands::unpack::execute(args, &ctx),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}

/// Print resolution failures as diagnostics, everything else as `error: ...`.
fn report(e: &anyhow::Error, color: bool) {
    let Some(resolve_error) = e.chain().find_map(|c| c.downcast_ref::<ResolveError>()) else {
        eprintln!("error: {:#}", e);
        return;
    };

    let mut diag = resolve_error.to_diagnostic();
    let outer = e.to_string();
    if outer != resolve_error.to_string() {
        diag = diag.with_context(outer);
    }
    diagnostic::emit(&diag, color);
}
