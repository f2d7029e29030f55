//! `nixbazel fetch` command

use anyhow::Result;

use crate::cli::FetchArgs;
use crate::commands::generate_options;
use nixbazel::codegen::generate;
use nixbazel::ops::{fetch_all, fetch_repository, require_lockfile, FetchOptions};
use nixbazel::sources::NixSource;
use nixbazel::store::Tools;
use nixbazel::util::GlobalContext;

pub fn execute(args: FetchArgs, ctx: &GlobalContext) -> Result<()> {
    let lockfile_path = ctx.resolve_path(&args.lockfile);
    let lock = require_lockfile(&lockfile_path)?;
    let source = NixSource::from_config(ctx.config())?;

    let mut options = FetchOptions::new(
        ctx.resolve_path(&args.out),
        Tools::detect(&ctx.config().tools),
    );
    options.jobs = args.jobs.or(ctx.config().fetch.jobs);
    options.progress = !ctx.is_verbose();

    let summary = match args.repo.as_deref() {
        Some(repo) => fetch_repository(&lock, repo, &source, &options)?,
        None => fetch_all(&lock, &source, &options)?,
    };

    eprintln!(
        "     Fetched {} packages ({} already present)",
        summary.unpacked, summary.skipped
    );

    if !args.no_generate {
        let generate_opts =
            generate_options(ctx, &args.out, &args.lockfile, args.channel, &args.generate);
        generate(&lock, &generate_opts)?;
    }

    Ok(())
}
