use std::fs::File;
use std::io::{stdout, Write};
use std::path::PathBuf;

use clap::Parser;
use flate2::write::GzEncoder;
use flate2::Compression;
use indicatif::ProgressIterator;

use crate::cli::Verbosity;
use crate::inspector::inspect;
use crate::prelude::*;

const PBAR_ARCHIVE: &str =
    "Archive shards: {human_pos}/{human_len} ({percent}%) | \
        elapsed: {elapsed_precise}{msg}";

/// Create an archive (tar.gz) of a complete version.
#[derive(Debug, Parser)]
pub(crate) struct Archive {
    #[command(flatten)]
    pub(crate) verbosity: Verbosity,

    #[arg(long, conflicts_with = "best")]
    fast: bool,

    #[arg(long, conflicts_with = "fast")]
    best: bool,

    /// Write the archive to `filename` instead of stdout.
    #[arg(short, long, value_name = "filename")]
    output: Option<PathBuf>,

    /// The directory of the dataset, which contains one directory per
    /// version.
    #[arg(
        long,
        alias = "base_dir",
        env = "DATAVER_BASE_DIR",
        value_name = "path"
    )]
    base_dir: PathBuf,

    /// The version to archive.
    #[arg(long, value_name = "version")]
    version: String,
}

/// Writes all files of a consistent version into a gzip compressed
/// tarball. Entries are prefixed with the name of the version.
fn write_archive<W: Write>(
    dataset: &DatasetDir,
    version: &str,
    out: W,
    level: Compression,
    quiet: bool,
) -> DataverResult<W> {
    let summary = inspect(dataset, version)?;
    let dir = &summary.dir;

    let gzip = GzEncoder::new(out, level);
    let mut archive = tar::Builder::new(gzip);

    let pbar = ProgressBarBuilder::new(PBAR_ARCHIVE, quiet)
        .len(summary.manifest.shards.len() as u64)
        .build();

    summary
        .manifest
        .shards
        .iter()
        .progress_with(pbar)
        .try_for_each(|shard| {
            let name = format!(
                "{version}/{}/{}",
                VersionDir::SHARDS_DIR,
                shard.file
            );
            let mut file = File::open(dir.shard_path(&shard.file))?;
            archive.append_file(name, &mut file)?;
            Ok::<(), DataverError>(())
        })?;

    for (name, path) in [
        (VersionDir::METADATA, dir.metadata_path()),
        (VersionDir::MANIFEST_TXT, dir.manifest_txt_path()),
        (VersionDir::MANIFEST, dir.manifest_path()),
    ] {
        if path.is_file() {
            let mut file = File::open(path)?;
            archive.append_file(format!("{version}/{name}"), &mut file)?;
        }
    }

    let gzip = archive.into_inner()?;
    Ok(gzip.finish()?)
}

impl Archive {
    pub(crate) fn execute(self) -> DataverResult<()> {
        let dataset = DatasetDir::new(&self.base_dir);

        let level = if self.fast {
            Compression::fast()
        } else if self.best {
            Compression::best()
        } else {
            Compression::default()
        };

        let out: Box<dyn Write> = match self.output {
            Some(path) => Box::new(File::create(path)?),
            None => Box::new(stdout().lock()),
        };

        let mut out = write_archive(
            &dataset,
            &self.version,
            out,
            level,
            self.verbosity.quiet,
        )?;

        out.flush()?;
        Ok(())
    }
}
