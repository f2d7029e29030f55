//! `nixbazel generate` command

use anyhow::Result;

use crate::cli::GenerateArgs;
use crate::commands::generate_options;
use nixbazel::ops::generate_from_lockfile;
use nixbazel::util::GlobalContext;

pub fn execute(args: GenerateArgs, ctx: &GlobalContext) -> Result<()> {
    let lockfile_path = ctx.resolve_path(&args.lockfile);
    let options = generate_options(ctx, &args.out, &args.lockfile, args.channel, &args.generate);

    let summary = generate_from_lockfile(&lockfile_path, &options)?;

    eprintln!(
        "   Generated {} packages, {} aliases",
        summary.packages, summary.aliases
    );
    if summary.dangling > 0 {
        eprintln!(
            "warning: {} references point outside the lockfile",
            summary.dangling
        );
    }

    Ok(())
}
