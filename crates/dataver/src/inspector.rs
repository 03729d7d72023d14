use std::fs;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::manifest::Manifest;
use crate::metadata::Metadata;
use crate::prelude::*;
use crate::record::Record;

/// A validated, complete dataset version.
#[derive(Debug)]
pub(crate) struct Summary {
    pub(crate) dir: VersionDir,
    pub(crate) manifest: Manifest,
    pub(crate) metadata: Metadata,
}

/// Opens a version of a dataset and checks its manifest and metadata
/// against each other, the directory and the shard files on disk.
/// Nothing is modified.
pub(crate) fn inspect(
    dataset: &DatasetDir,
    version: &str,
) -> DataverResult<Summary> {
    let dir = dataset.open(version)?;
    let manifest = dir.manifest()?;
    manifest.check()?;

    let name = dir.name();
    if manifest.version != name {
        return Err(DataverError::corrupt(format!(
            "manifest version {:?} doesn't match directory {name:?}",
            manifest.version
        )));
    }

    let metadata = dir.metadata()?;
    if metadata.version != name {
        return Err(DataverError::corrupt(format!(
            "metadata version {:?} doesn't match directory {name:?}",
            metadata.version
        )));
    }

    if metadata.dataset_name != manifest.dataset_name {
        return Err(DataverError::corrupt(format!(
            "dataset name mismatch (manifest = {:?}, metadata = {:?})",
            manifest.dataset_name, metadata.dataset_name
        )));
    }

    if metadata.num_examples != manifest.total_records
        || metadata.num_shards != manifest.shards.len() as u64
    {
        return Err(DataverError::corrupt(format!(
            "metadata reports {} records in {} shards, manifest lists \
                {} records in {} shards",
            metadata.num_examples,
            metadata.num_shards,
            manifest.total_records,
            manifest.shards.len()
        )));
    }

    for shard in manifest.shards.iter() {
        if !dir.shard_path(&shard.file).is_file() {
            return Err(DataverError::corrupt(format!(
                "shard {:?} is listed but doesn't exist",
                shard.file
            )));
        }
    }

    Ok(Summary {
        dir,
        manifest,
        metadata,
    })
}

impl Summary {
    #[inline]
    pub(crate) fn num_shards(&self) -> usize {
        self.manifest.shards.len()
    }

    #[inline]
    pub(crate) fn total_records(&self) -> u64 {
        self.manifest.total_records
    }

    /// Picks a random record out of a random shard. Returns `None`
    /// for an empty version.
    pub(crate) fn sample<R: Rng>(
        &self,
        rng: &mut R,
    ) -> DataverResult<Option<(String, Record)>> {
        let Some(shard) = self.manifest.shards.choose(rng) else {
            return Ok(None);
        };

        let content = fs::read_to_string(self.dir.shard_path(&shard.file))?;
        let lines: Vec<&str> = content.lines().collect();

        let Some(line) = lines.choose(rng) else {
            return Ok(None);
        };

        let record: Record = serde_json::from_str(line).map_err(|e| {
            DataverError::corrupt(format!("{}: {e}", shard.file))
        })?;

        Ok(Some((shard.file.clone(), record)))
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::Value;

    use super::*;
    use crate::builder::tests::{config, corpus};
    use crate::builder::{build, BuildOptions};

    type TestResult = anyhow::Result<()>;

    fn setup(
        tmp: &tempfile::TempDir,
        n: usize,
    ) -> anyhow::Result<DatasetDir> {
        let source = corpus(tmp.path(), n)?;
        let config = config(tmp.path(), &source, 1000);
        let options = BuildOptions {
            force: false,
            quiet: true,
        };

        let _ = build(&config, &options)?;
        Ok(DatasetDir::new(config.dataset_dir()))
    }

    /// Rewrites a JSON file of the version directory.
    fn patch<F>(path: std::path::PathBuf, f: F) -> TestResult
    where
        F: FnOnce(&mut Value),
    {
        let mut value: Value = serde_json::from_str(&fs::read_to_string(&path)?)?;
        f(&mut value);
        fs::write(&path, serde_json::to_string_pretty(&value)?)?;
        Ok(())
    }

    #[test]
    fn inspect_summary() -> TestResult {
        let tmp = tempfile::tempdir()?;
        let dataset = setup(&tmp, 2500)?;
        let summary = inspect(&dataset, "v1.0.0")?;

        assert_eq!(summary.num_shards(), 3);
        assert_eq!(summary.total_records(), 2500);
        assert_eq!(summary.metadata.dataset_name, "demo-wikitext");
        assert_eq!(summary.metadata.version, "v1.0.0");

        Ok(())
    }

    #[test]
    fn inspect_does_not_modify() -> TestResult {
        let tmp = tempfile::tempdir()?;
        let dataset = setup(&tmp, 10)?;
        let dir = dataset.open("v1.0.0")?;
        let before = fs::read(dir.manifest_path())?;

        let _ = inspect(&dataset, "v1.0.0")?;
        assert_eq!(fs::read(dir.manifest_path())?, before);

        Ok(())
    }

    #[test]
    fn missing_version() -> TestResult {
        let tmp = tempfile::tempdir()?;
        let dataset = setup(&tmp, 10)?;

        assert!(matches!(
            inspect(&dataset, "v2.0.0"),
            Err(DataverError::VersionNotFound(_))
        ));

        Ok(())
    }

    #[test]
    fn missing_manifest() -> TestResult {
        let tmp = tempfile::tempdir()?;
        let dataset = setup(&tmp, 10)?;
        fs::remove_file(dataset.open("v1.0.0")?.manifest_path())?;

        assert!(matches!(
            inspect(&dataset, "v1.0.0"),
            Err(DataverError::VersionNotFound(_))
        ));

        Ok(())
    }

    #[test]
    fn count_mismatch_is_corrupt() -> TestResult {
        let tmp = tempfile::tempdir()?;
        let dataset = setup(&tmp, 2500)?;
        let dir = dataset.open("v1.0.0")?;

        patch(dir.manifest_path(), |value| {
            value["total_records"] = Value::from(2400);
        })?;

        assert!(matches!(
            inspect(&dataset, "v1.0.0"),
            Err(DataverError::CorruptManifest(_))
        ));

        Ok(())
    }

    #[test]
    fn missing_field_is_corrupt() -> TestResult {
        let tmp = tempfile::tempdir()?;
        let dataset = setup(&tmp, 10)?;
        let dir = dataset.open("v1.0.0")?;

        patch(dir.manifest_path(), |value| {
            if let Some(map) = value.as_object_mut() {
                map.remove("shards");
            }
        })?;

        assert!(matches!(
            inspect(&dataset, "v1.0.0"),
            Err(DataverError::CorruptManifest(_))
        ));

        Ok(())
    }

    #[test]
    fn metadata_version_mismatch() -> TestResult {
        let tmp = tempfile::tempdir()?;
        let dataset = setup(&tmp, 10)?;
        let dir = dataset.open("v1.0.0")?;

        patch(dir.metadata_path(), |value| {
            value["version"] = Value::from("v0.9.0");
        })?;

        assert!(matches!(
            inspect(&dataset, "v1.0.0"),
            Err(DataverError::CorruptManifest(_))
        ));

        Ok(())
    }

    #[test]
    fn missing_metadata() -> TestResult {
        let tmp = tempfile::tempdir()?;
        let dataset = setup(&tmp, 10)?;
        fs::remove_file(dataset.open("v1.0.0")?.metadata_path())?;

        assert!(matches!(
            inspect(&dataset, "v1.0.0"),
            Err(DataverError::CorruptManifest(_))
        ));

        Ok(())
    }

    #[test]
    fn missing_shard_file() -> TestResult {
        let tmp = tempfile::tempdir()?;
        let dataset = setup(&tmp, 10)?;
        let dir = dataset.open("v1.0.0")?;
        fs::remove_file(dir.shard_path("part-00000.jsonl"))?;

        assert!(matches!(
            inspect(&dataset, "v1.0.0"),
            Err(DataverError::CorruptManifest(_))
        ));

        Ok(())
    }

    #[test]
    fn renamed_version_directory() -> TestResult {
        let tmp = tempfile::tempdir()?;
        let dataset = setup(&tmp, 10)?;
        fs::rename(
            dataset.version_dir("v1.0.0"),
            dataset.version_dir("v1.0.1"),
        )?;

        assert!(matches!(
            inspect(&dataset, "v1.0.1"),
            Err(DataverError::CorruptManifest(_))
        ));

        Ok(())
    }

    #[test]
    fn sample_record() -> TestResult {
        let tmp = tempfile::tempdir()?;
        let dataset = setup(&tmp, 50)?;
        let summary = inspect(&dataset, "v1.0.0")?;

        let mut rng = StdRng::seed_from_u64(7);
        let (file, record) = summary
            .sample(&mut rng)?
            .ok_or_else(|| anyhow::anyhow!("expected a sample"))?;

        assert_eq!(file, "part-00000.jsonl");
        assert!(record.text.starts_with("record number "));

        Ok(())
    }

    #[test]
    fn sample_empty_version() -> TestResult {
        let tmp = tempfile::tempdir()?;
        let dataset = setup(&tmp, 0)?;
        let summary = inspect(&dataset, "v1.0.0")?;

        let mut rng = StdRng::seed_from_u64(7);
        assert!(summary.sample(&mut rng)?.is_none());

        Ok(())
    }
}
