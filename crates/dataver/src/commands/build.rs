use std::path::PathBuf;

use clap::Parser;
use humansize::{format_size, BINARY};

use crate::builder::{build, BuildOptions};
use crate::cli::Verbosity;
use crate::prelude::*;

/// Build a new version of a dataset.
///
/// Fetches the configured source, writes the records as shards into
/// `<base_dir>/<dataset_name>/<version>` and records a manifest and
/// the provenance metadata of the version.
#[derive(Debug, Parser)]
pub(crate) struct Build {
    #[command(flatten)]
    pub(crate) verbosity: Verbosity,

    /// Whether to replace an existing version or not. By default, the
    /// build fails if the version directory already exists.
    #[arg(short, long)]
    force: bool,

    /// The config of the version to build.
    #[arg(short, long, value_name = "path")]
    config: PathBuf,
}

impl Build {
    pub(crate) fn execute(self) -> DataverResult<()> {
        let config = Config::from_path(&self.config)?;
        let options = BuildOptions {
            force: self.force,
            quiet: self.verbosity.quiet,
        };

        let report = build(&config, &options)?;

        if !self.verbosity.quiet {
            eprintln!(
                "Built dataset '{}' version {}: {} of {} records in \
                    {} shards ({}).",
                report.manifest.dataset_name,
                report.manifest.version,
                report.manifest.total_records,
                report.metadata.num_raw_examples,
                report.manifest.shards.len(),
                format_size(report.manifest.total_bytes, BINARY)
            );
        }

        println!("{}", report.dir.root_dir().display());
        Ok(())
    }
}
