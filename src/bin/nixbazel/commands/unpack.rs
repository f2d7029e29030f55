//! `nixbazel unpack` command

use std::path::Path;

use anyhow::{Context, Result};

use crate::cli::UnpackArgs;
use nixbazel::core::store_path;
use nixbazel::sources::NixSource;
use nixbazel::store::unpack::compression_from_name;
use nixbazel::store::{unpack_archive, Outcome, Tools};
use nixbazel::util::GlobalContext;

pub fn execute(args: UnpackArgs, ctx: &GlobalContext) -> Result<()> {
    if !store_path::is_store_path(&args.store_path) {
        anyhow::bail!(
            "`{}` is not a store path (expected /nix/store/<hash>-<name>)",
            args.store_path
        );
    }

    let archive = if args.archive.starts_with("http://") || args.archive.starts_with("https://") {
        args.archive.clone()
    } else {
        ctx.resolve_path(Path::new(&args.archive)).display().to_string()
    };
    let compression = args
        .compression
        .clone()
        .unwrap_or_else(|| compression_from_name(&args.archive).to_string());

    let tools = Tools::detect(&ctx.config().tools);
    tools.warn_missing();
    let source = NixSource::from_config(ctx.config())?;

    let out = ctx.resolve_path(&args.out);
    let outcome = unpack_archive(
        &archive,
        &args.store_path,
        &args.refs,
        &compression,
        &out,
        &source,
        &tools,
    )
    .with_context(|| format!("failed to unpack {}", args.archive))?;

    match outcome {
        Outcome::Skipped => eprintln!(
            "     Skipped {} (already present)",
            store_path::basename(&args.store_path)
        ),
        Outcome::Unpacked { patched } => eprintln!(
            "    Unpacked {} ({} objects relocated)",
            store_path::basename(&args.store_path),
            patched
        ),
    }

    Ok(())
}
