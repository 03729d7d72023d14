use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use glob::{glob_with, MatchOptions, Pattern};
use indicatif::ParallelProgressIterator;
use rayon::prelude::*;

use crate::cli::Verbosity;
use crate::inspector::inspect;
use crate::manifest::{Manifest, ShardEntry};
use crate::prelude::*;
use crate::record::Record;
use crate::utils::file_digest;

const PBAR_VERIFY: &str =
    "Verifying shards: {human_pos}/{human_len} ({percent}%) | \
        elapsed: {elapsed_precise}{msg}";

#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Default, ValueEnum)]
pub(crate) enum VerifyMode {
    Permissive,
    #[default]
    Strict,
    Pedantic,
}

/// Verify that the shards of a version match its manifest.
#[derive(Debug, Parser)]
pub(crate) struct Verify {
    #[command(flatten)]
    pub(crate) verbosity: Verbosity,

    /// Set the verify mode: permissive, strict (default), or
    /// pedantic.
    #[arg(
        short,
        long,
        default_value = "strict",
        value_name = "mode",
        hide_possible_values = true,
        hide_default_value = true
    )]
    mode: VerifyMode,

    /// The directory of the dataset, which contains one directory per
    /// version.
    #[arg(
        long,
        alias = "base_dir",
        env = "DATAVER_BASE_DIR",
        value_name = "path"
    )]
    base_dir: PathBuf,

    /// The version to verify.
    #[arg(long, value_name = "version")]
    version: String,
}

/// Returns the files of the shards directory, which aren't listed in
/// the manifest.
fn untracked_shards(
    dir: &VersionDir,
    manifest: &Manifest,
) -> DataverResult<Vec<String>> {
    let pattern = format!(
        "{}/*",
        Pattern::escape(&dir.shards_dir().to_string_lossy())
    );

    let mut files: BTreeSet<String> =
        glob_with(&pattern, MatchOptions::default())
            .map_err(DataverError::other)?
            .filter_map(Result::ok)
            .filter_map(|path| {
                path.file_name()
                    .map(|name| name.to_string_lossy().to_string())
            })
            .collect();

    for shard in manifest.shards.iter() {
        files.remove(&shard.file);
    }

    Ok(files.into_iter().collect())
}

fn verify_shard(
    dir: &VersionDir,
    shard: &ShardEntry,
    mode: VerifyMode,
) -> DataverResult<()> {
    let path = dir.shard_path(&shard.file);
    if !path.is_file() {
        return Err(DataverError::corrupt(format!(
            "verification failed: shard not found (path = {path:?})"
        )));
    }

    if mode >= VerifyMode::Strict {
        let (digest, size) = file_digest(&path)?;

        if size != shard.num_bytes {
            return Err(DataverError::corrupt(format!(
                "verification failed: size mismatch (expected {}, \
                    found {size}, path = {path:?})",
                shard.num_bytes
            )));
        }

        if digest != shard.sha256 {
            return Err(DataverError::corrupt(format!(
                "verification failed: hash mismatch (path = {path:?})"
            )));
        }
    }

    if mode >= VerifyMode::Pedantic {
        let content = fs::read_to_string(&path)?;
        let mut count = 0u64;

        for (idx, line) in content.lines().enumerate() {
            serde_json::from_str::<Record>(line).map_err(|e| {
                DataverError::corrupt(format!(
                    "verification failed: invalid record in line {} \
                        ({e}, path = {path:?})",
                    idx + 1
                ))
            })?;

            count += 1;
        }

        if count != shard.num_records {
            return Err(DataverError::corrupt(format!(
                "verification failed: record count mismatch (expected \
                    {}, found {count}, path = {path:?})",
                shard.num_records
            )));
        }
    }

    Ok(())
}

/// Checks all shards of a (consistent) version in parallel.
fn verify_version(
    dataset: &DatasetDir,
    version: &str,
    mode: VerifyMode,
    quiet: bool,
) -> DataverResult<usize> {
    let summary = inspect(dataset, version)?;
    let manifest = &summary.manifest;

    let untracked = untracked_shards(&summary.dir, manifest)?;
    if !untracked.is_empty() {
        return Err(DataverError::corrupt(format!(
            "verification failed: untracked shard files {untracked:?}"
        )));
    }

    let pbar = ProgressBarBuilder::new(PBAR_VERIFY, quiet)
        .len(manifest.shards.len() as u64)
        .build();

    manifest
        .shards
        .par_iter()
        .progress_with(pbar)
        .try_for_each(|shard| verify_shard(&summary.dir, shard, mode))?;

    Ok(manifest.shards.len())
}

impl Verify {
    pub(crate) fn execute(self) -> DataverResult<()> {
        let dataset = DatasetDir::new(&self.base_dir);
        let n = verify_version(
            &dataset,
            &self.version,
            self.mode,
            self.verbosity.quiet,
        )?;

        if !self.verbosity.quiet {
            println!("OK, {n} shards of version {} verified.", self.version);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::tests::{config, corpus};
    use crate::builder::{build, BuildOptions};

    type TestResult = anyhow::Result<()>;

    fn setup(tmp: &tempfile::TempDir) -> anyhow::Result<DatasetDir> {
        let source = corpus(tmp.path(), 25)?;
        let config = config(tmp.path(), &source, 10);
        let options = BuildOptions {
            force: false,
            quiet: true,
        };

        let _ = build(&config, &options)?;
        Ok(DatasetDir::new(config.dataset_dir()))
    }

    fn verify(dataset: &DatasetDir, mode: VerifyMode) -> DataverResult<usize> {
        verify_version(dataset, "v1.0.0", mode, true)
    }

    #[test]
    fn intact_version() -> TestResult {
        let tmp = tempfile::tempdir()?;
        let dataset = setup(&tmp)?;

        assert_eq!(verify(&dataset, VerifyMode::Permissive)?, 3);
        assert_eq!(verify(&dataset, VerifyMode::Strict)?, 3);
        assert_eq!(verify(&dataset, VerifyMode::Pedantic)?, 3);

        Ok(())
    }

    #[test]
    fn modified_shard() -> TestResult {
        let tmp = tempfile::tempdir()?;
        let dataset = setup(&tmp)?;
        let dir = dataset.open("v1.0.0")?;

        // same size, different content
        let path = dir.shard_path("part-00001.jsonl");
        let content = fs::read_to_string(&path)?.replace("record", "RECORD");
        fs::write(&path, content)?;

        assert!(verify(&dataset, VerifyMode::Permissive).is_ok());
        assert!(matches!(
            verify(&dataset, VerifyMode::Strict),
            Err(DataverError::CorruptManifest(msg)) if msg.contains("hash")
        ));

        Ok(())
    }

    #[test]
    fn truncated_shard() -> TestResult {
        let tmp = tempfile::tempdir()?;
        let dataset = setup(&tmp)?;
        let dir = dataset.open("v1.0.0")?;

        fs::write(dir.shard_path("part-00002.jsonl"), "")?;

        assert!(matches!(
            verify(&dataset, VerifyMode::Strict),
            Err(DataverError::CorruptManifest(msg)) if msg.contains("size")
        ));

        Ok(())
    }

    #[test]
    fn untracked_file() -> TestResult {
        let tmp = tempfile::tempdir()?;
        let dataset = setup(&tmp)?;
        let dir = dataset.open("v1.0.0")?;

        fs::write(dir.shard_path("part-00003.jsonl"), "{\"text\":\"x\"}\n")?;

        assert!(matches!(
            verify(&dataset, VerifyMode::Permissive),
            Err(DataverError::CorruptManifest(msg))
                if msg.contains("part-00003.jsonl")
        ));

        Ok(())
    }

    #[test]
    fn missing_version() -> TestResult {
        let tmp = tempfile::tempdir()?;
        let dataset = setup(&tmp)?;

        assert!(matches!(
            verify_version(&dataset, "v0.0.1", VerifyMode::Strict, true),
            Err(DataverError::VersionNotFound(_))
        ));

        Ok(())
    }
}
