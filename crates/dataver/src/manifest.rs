//! The manifest of a dataset version.
//!
//! A manifest lists the shards of a version in index order together
//! with their record counts, sizes and SHA256 digests. The manifest is
//! the last file written by a build, so its presence marks a version
//! as complete.

use std::fmt::Write;
use std::fs::{self, File};
use std::io::{BufWriter, Write as _};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::prelude::*;
use crate::shard::shard_file_name;
use crate::utils::sha256_hex;

/// Current manifest schema version.
pub(crate) const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct ShardEntry {
    /// File name relative to the shards directory.
    pub(crate) file: String,
    pub(crate) num_records: u64,
    pub(crate) num_bytes: u64,
    pub(crate) sha256: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct Manifest {
    pub(crate) format_version: u32,
    pub(crate) dataset_name: String,
    pub(crate) version: String,
    pub(crate) total_records: u64,
    pub(crate) total_bytes: u64,

    /// Fingerprint of the whole version.
    pub(crate) sha256: String,
    pub(crate) shards: Vec<ShardEntry>,
}

impl Manifest {
    /// Creates a new manifest and computes the totals and the
    /// fingerprint from the given shards.
    pub(crate) fn new<S: Into<String>>(
        dataset_name: S,
        version: S,
        shards: Vec<ShardEntry>,
    ) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            dataset_name: dataset_name.into(),
            version: version.into(),
            total_records: shards.iter().map(|s| s.num_records).sum(),
            total_bytes: shards.iter().map(|s| s.num_bytes).sum(),
            sha256: Self::fingerprint(&shards),
            shards,
        }
    }

    /// Returns the fingerprint of a version, which is the SHA256
    /// digest of the concatenated shard digests in index order.
    pub(crate) fn fingerprint(shards: &[ShardEntry]) -> String {
        sha256_hex(
            shards
                .iter()
                .map(|shard| shard.sha256.as_str())
                .collect::<String>(),
        )
    }

    /// Reads a manifest. Unreadable or malformed manifests are
    /// reported as corrupt.
    pub(crate) fn from_path<P: AsRef<Path>>(path: P) -> DataverResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            DataverError::corrupt(format!(
                "unable to read {}: {e}",
                path.display()
            ))
        })?;

        serde_json::from_str(&content).map_err(|e| {
            DataverError::corrupt(format!("{}: {e}", path.display()))
        })
    }

    /// Writes the manifest in JSON format.
    pub(crate) fn save<P: AsRef<Path>>(&self, path: P) -> DataverResult<()> {
        let mut out = BufWriter::new(File::create_new(path)?);
        serde_json::to_writer_pretty(&mut out, self)?;
        out.write_all(b"\n")?;

        let file = out.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        Ok(())
    }

    /// Returns the human-readable form of the manifest (one line per
    /// shard).
    pub(crate) fn to_text(&self) -> String {
        self.shards.iter().fold(String::new(), |mut out, shard| {
            let _ = writeln!(
                out,
                "{} sha256={} num_records={}",
                shard.file, shard.sha256, shard.num_records
            );
            out
        })
    }

    /// Checks the invariants of the manifest, which can be verified
    /// without touching the shard files.
    pub(crate) fn check(&self) -> DataverResult<()> {
        if self.format_version != FORMAT_VERSION {
            return Err(DataverError::corrupt(format!(
                "unsupported format version {}",
                self.format_version
            )));
        }

        if self.dataset_name.is_empty() || self.version.is_empty() {
            return Err(DataverError::corrupt(
                "empty dataset name or version",
            ));
        }

        for (idx, shard) in self.shards.iter().enumerate() {
            let expected = shard_file_name(idx);
            if shard.file != expected {
                return Err(DataverError::corrupt(format!(
                    "unexpected shard file {:?} at position {idx} \
                        (expected {expected:?})",
                    shard.file
                )));
            }

            if shard.num_records == 0 {
                return Err(DataverError::corrupt(format!(
                    "empty shard {:?}",
                    shard.file
                )));
            }
        }

        let records: u64 = self.shards.iter().map(|s| s.num_records).sum();
        if records != self.total_records {
            return Err(DataverError::corrupt(format!(
                "total_records is {}, but the shards hold {records} \
                    records",
                self.total_records
            )));
        }

        let bytes: u64 = self.shards.iter().map(|s| s.num_bytes).sum();
        if bytes != self.total_bytes {
            return Err(DataverError::corrupt(format!(
                "total_bytes is {}, but the shards hold {bytes} bytes",
                self.total_bytes
            )));
        }

        if Self::fingerprint(&self.shards) != self.sha256 {
            return Err(DataverError::corrupt(
                "fingerprint doesn't match the shard digests",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult = anyhow::Result<()>;

    fn entry(idx: usize, num_records: u64) -> ShardEntry {
        ShardEntry {
            file: shard_file_name(idx),
            num_records,
            num_bytes: num_records * 10,
            sha256: format!("{idx:064x}"),
        }
    }

    fn manifest() -> Manifest {
        Manifest::new(
            "demo-wikitext",
            "v1.0.0",
            vec![entry(0, 1000), entry(1, 1000), entry(2, 500)],
        )
    }

    #[test]
    fn totals_are_computed() {
        let manifest = manifest();
        assert_eq!(manifest.total_records, 2500);
        assert_eq!(manifest.total_bytes, 25000);
        assert_eq!(manifest.sha256, Manifest::fingerprint(&manifest.shards));
        assert!(manifest.check().is_ok());
    }

    #[test]
    fn empty_manifest_is_valid() {
        let manifest = Manifest::new("demo", "v0.1.0", vec![]);
        assert_eq!(manifest.total_records, 0);
        assert!(manifest.check().is_ok());
    }

    #[test]
    fn count_mismatch() {
        let mut manifest = manifest();
        manifest.total_records = 2400;
        assert!(matches!(
            manifest.check(),
            Err(DataverError::CorruptManifest(_))
        ));
    }

    #[test]
    fn unexpected_file_name() {
        let mut manifest = manifest();
        manifest.shards.swap(0, 1);
        manifest.sha256 = Manifest::fingerprint(&manifest.shards);
        assert!(matches!(
            manifest.check(),
            Err(DataverError::CorruptManifest(_))
        ));
    }

    #[test]
    fn fingerprint_mismatch() {
        let mut manifest = manifest();
        manifest.shards[2].sha256 = format!("{:064x}", 99);
        assert!(matches!(
            manifest.check(),
            Err(DataverError::CorruptManifest(_))
        ));
    }

    #[test]
    fn text_form() {
        let manifest = Manifest::new("demo", "v1", vec![entry(0, 3)]);
        assert_eq!(
            manifest.to_text(),
            format!("part-00000.jsonl sha256={:064x} num_records=3\n", 0)
        );
    }

    #[test]
    fn save_and_read() -> TestResult {
        let tmp = tempfile::tempdir()?;
        let path = tmp.path().join("manifest.json");
        let manifest = manifest();

        manifest.save(&path)?;
        assert_eq!(Manifest::from_path(&path)?, manifest);

        Ok(())
    }

    #[test]
    fn missing_field_is_corrupt() -> TestResult {
        let tmp = tempfile::tempdir()?;
        let path = tmp.path().join("manifest.json");
        fs::write(
            &path,
            r#"{"format_version": 1, "dataset_name": "demo", "shards": []}"#,
        )?;

        assert!(matches!(
            Manifest::from_path(&path),
            Err(DataverError::CorruptManifest(_))
        ));

        Ok(())
    }
}
