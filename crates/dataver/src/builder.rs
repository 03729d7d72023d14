//! Builds a new dataset version.
//!
//! A build writes all shards, the metadata and finally the manifest
//! into a hidden staging directory next to the target directory. Only
//! after the manifest has been written, the staging directory is
//! renamed to the version directory. A failed build removes its
//! staging directory, so a version directory without a manifest is
//! never left behind.

use std::path::{Path, PathBuf};
use std::{env, fs};

use chrono::Utc;
use indicatif::ProgressIterator;
use log::{info, warn};

use crate::config::{is_semver_like, OnExisting};
use crate::manifest::{Manifest, ShardEntry};
use crate::metadata::Metadata;
use crate::prelude::*;
use crate::record::{process, Processed};
use crate::shard::{plan_shards, write_shard};
use crate::source::{LoadOptions, Source};

const PBAR_SHARDS: &str =
    "Writing shards: {human_pos}/{human_len} ({percent}%) | \
        elapsed: {elapsed_precise}{msg}";

#[derive(Debug, Default)]
pub(crate) struct BuildOptions {
    /// Replace an existing version directory.
    pub(crate) force: bool,

    /// Hide progress bars.
    pub(crate) quiet: bool,
}

#[derive(Debug)]
pub(crate) struct BuildReport {
    pub(crate) dir: VersionDir,
    pub(crate) manifest: Manifest,
    pub(crate) metadata: Metadata,
}

/// Builds the version described by `config`.
pub(crate) fn build(
    config: &Config,
    options: &BuildOptions,
) -> DataverResult<BuildReport> {
    config.validate()?;

    if !is_semver_like(&config.version) {
        warn!(
            "version {:?} doesn't follow the semantic versioning \
                convention (e.g. v1.0.0)",
            config.version
        );
    }

    let dataset = DatasetDir::new(config.dataset_dir());
    let target = dataset.version_dir(&config.version);
    let overwrite =
        options.force || config.on_existing == OnExisting::Overwrite;

    if target.exists() && !overwrite {
        return Err(DataverError::VersionExists(target));
    }

    info!(
        "building dataset '{}' version {} in {}",
        config.dataset_name,
        config.version,
        target.display()
    );

    let source = Source::parse(&config.source)?;
    let raw = source.load(&LoadOptions {
        split: &config.split,
        text_field: &config.text_field,
        quiet: options.quiet,
    })?;

    info!("loaded raw dataset with {} examples", raw.len());

    let processed = process(raw, &config.processing, &config.filters);
    info!(
        "kept {} / {} examples after filtering",
        processed.records.len(),
        processed.num_raw
    );

    if processed.records.is_empty() {
        warn!("no records left after filtering; building an empty version");
    }

    let staging = VersionDir::new(dataset.staging_dir(&config.version));
    if staging.root_dir().exists() {
        warn!(
            "removing stale staging directory {}",
            staging.root_dir().display()
        );
        fs::remove_dir_all(staging.root_dir())?;
    }

    fs::create_dir_all(staging.shards_dir())?;

    let result = write_version(&staging, config, &source, &processed, options)
        .and_then(|(manifest, metadata)| {
            publish(&dataset, &staging, &target)?;
            Ok((manifest, metadata))
        });

    match result {
        Ok((manifest, metadata)) => {
            info!(
                "wrote {} records in {} shards to {}",
                manifest.total_records,
                manifest.shards.len(),
                target.display()
            );

            Ok(BuildReport {
                dir: VersionDir::new(target),
                manifest,
                metadata,
            })
        }
        Err(e) => {
            if let Err(cleanup) = fs::remove_dir_all(staging.root_dir()) {
                warn!(
                    "unable to remove staging directory {}: {cleanup}",
                    staging.root_dir().display()
                );
            }

            Err(e)
        }
    }
}

/// Writes shards, metadata and manifest (in that order) into `dir`.
fn write_version(
    dir: &VersionDir,
    config: &Config,
    source: &Source,
    processed: &Processed,
    options: &BuildOptions,
) -> DataverResult<(Manifest, Metadata)> {
    let lines = processed
        .records
        .iter()
        .map(serde_json::to_string)
        .collect::<Result<Vec<_>, _>>()?;

    let plan = plan_shards(
        lines.iter().map(|line| line.len() as u64),
        config.shard_size,
        config.max_shard_bytes,
    );

    let pbar = ProgressBarBuilder::new(PBAR_SHARDS, options.quiet)
        .len(plan.len() as u64)
        .build();

    let shards_dir = dir.shards_dir();
    let shards = plan
        .into_iter()
        .enumerate()
        .progress_with(pbar)
        .map(|(idx, range)| write_shard(&shards_dir, idx, &lines[range]))
        .collect::<DataverResult<Vec<ShardEntry>>>()?;

    let manifest = Manifest::new(
        config.dataset_name.as_str(),
        config.version.as_str(),
        shards,
    );

    let metadata = Metadata {
        version: config.version.clone(),
        dataset_name: config.dataset_name.clone(),
        description: config.description.clone(),
        created_at: Utc::now(),
        builder: Metadata::builder(),
        source: config.source.clone(),
        resolved_source: source.to_string(),
        split: config.split.clone(),
        text_field: config.text_field.clone(),
        filters: config.filters.clone(),
        processing: config.processing.clone(),
        shard_size: config.shard_size,
        max_shard_bytes: config.max_shard_bytes,
        num_raw_examples: processed.num_raw as u64,
        num_examples: manifest.total_records,
        num_duplicates: processed.num_duplicates as u64,
        num_shards: manifest.shards.len() as u64,
        estimated_num_tokens: processed
            .records
            .iter()
            .map(|record| record.num_tokens() as u64)
            .sum(),
        config_path: absolute(config.path()),
    };

    metadata.save(dir.metadata_path())?;
    fs::write(dir.manifest_txt_path(), manifest.to_text())?;
    manifest.save(dir.manifest_path())?;

    Ok((manifest, metadata))
}

/// Moves the staging directory into place. An existing version
/// directory is moved aside first and only removed after the new
/// version is in place.
fn publish(
    dataset: &DatasetDir,
    staging: &VersionDir,
    target: &Path,
) -> DataverResult<()> {
    if !target.exists() {
        fs::rename(staging.root_dir(), target)?;
        return Ok(());
    }

    let name = target
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();
    let replaced = dataset.base_dir().join(format!(".{name}.replaced"));

    if replaced.exists() {
        fs::remove_dir_all(&replaced)?;
    }

    info!("replacing existing version {}", target.display());
    fs::rename(target, &replaced)?;

    if let Err(e) = fs::rename(staging.root_dir(), target) {
        fs::rename(&replaced, target)?;
        return Err(e.into());
    }

    fs::remove_dir_all(&replaced)?;
    Ok(())
}

fn absolute(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| {
        env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    })
}
