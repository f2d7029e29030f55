//! `nixbazel resolve` command

use anyhow::Result;

use crate::cli::{GenerateFlags, ResolveArgs};
use crate::commands::generate_options;
use nixbazel::codegen::generate;
use nixbazel::core::Manifest;
use nixbazel::ops::{
    fetch_all, load_lockfile, resolve_all, save_lockfile, FetchOptions, ResolveOptions,
};
use nixbazel::sources::NixSource;
use nixbazel::store::Tools;
use nixbazel::util::diagnostic::suggestions;
use nixbazel::util::GlobalContext;

pub fn execute(args: ResolveArgs, ctx: &GlobalContext) -> Result<()> {
    let config_path = ctx.resolve_path(&args.config);
    let lockfile_path = ctx.resolve_path(&args.lockfile);

    let manifest = Manifest::load(&config_path)?;
    let prior = load_lockfile(&lockfile_path)?;
    let source = NixSource::from_config(ctx.config())?;

    let options = ResolveOptions {
        channel: args.channel.clone(),
        force: args.force,
    };
    let lock = resolve_all(&manifest, prior.as_ref(), &source, &options)?;

    if prior.as_ref() == Some(&lock) {
        tracing::info!("Lockfile is up to date");
        tracing::debug!("{}", suggestions::FORCE_REFRESH);
    } else {
        save_lockfile(&lockfile_path, &lock)?;
    }

    if args.fetch {
        let Some(out) = args.out.as_deref() else {
            anyhow::bail!("--fetch requires --out");
        };

        let mut fetch =
            FetchOptions::new(ctx.resolve_path(out), Tools::detect(&ctx.config().tools));
        fetch.jobs = args.jobs.or(ctx.config().fetch.jobs);
        fetch.progress = !ctx.is_verbose();
        fetch_all(&lock, &source, &fetch)?;

        let flags = GenerateFlags {
            repo_name: args.repo_name.clone(),
            config_name: args.config.display().to_string(),
        };
        let options = generate_options(ctx, out, &args.lockfile, args.channel, &flags);
        generate(&lock, &options)?;
    }

    Ok(())
}
