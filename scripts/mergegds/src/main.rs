use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use mergegds::{merge_with, CellConflict, MergeOptions};

#[derive(Parser)]
#[command(
    author,
    version,
    about,
    long_about = "Merge GDS files: read a base layout, read each patch layout into it, and write the result"
)]
pub struct Args {
    /// The output layout file.
    ///
    /// Written as JSON, YAML, or TOML for those extensions, and as GDS otherwise.
    #[arg(short, long, visible_alias = "outfile")]
    output: PathBuf,
    /// How to resolve cells defined in more than one input.
    #[arg(long, value_enum)]
    conflict: Option<CellConflict>,
    /// Name of the output library.
    #[arg(long)]
    libname: Option<String>,
    /// TOML file of merge options. Command-line flags take precedence.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Where to write a summary of the merge, as JSON, YAML, or TOML.
    #[arg(long)]
    summary: Option<PathBuf>,
    /// The input layout files: the base layout, then patches in order.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
}

impl Args {
    fn options(&self) -> anyhow::Result<MergeOptions> {
        let mut opts = match self.config {
            Some(ref path) => MergeOptions::from_file(path)?,
            None => MergeOptions::default(),
        };
        if let Some(conflict) = self.conflict {
            opts.conflict = conflict;
        }
        if let Some(ref name) = self.libname {
            opts.libname = Some(name.into());
        }
        Ok(opts)
    }
}

pub fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let opts = args.options()?;
    let report = merge_with(&args.output, &args.inputs, &opts).with_context(|| {
        format!(
            "failed to merge {} GDS files into {:?}",
            args.inputs.len(),
            args.output
        )
    })?;
    if let Some(ref summary) = args.summary {
        report.save(summary)?;
    }
    Ok(())
}
