use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};

use crate::manifest::Manifest;
use crate::metadata::Metadata;
use crate::prelude::*;

const STAGING_SUFFIX: &str = ".partial";

/// The directory of a dataset, which holds one directory per version.
#[derive(Debug, Clone)]
pub(crate) struct DatasetDir {
    root_dir: PathBuf,
}

/// An entry of a dataset directory.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct VersionEntry {
    pub(crate) name: String,
    pub(crate) path: PathBuf,
    pub(crate) staging: bool,
}

impl DatasetDir {
    pub(crate) fn new<P: Into<PathBuf>>(root_dir: P) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    /// Returns the base directory of the dataset.
    #[inline]
    pub(crate) fn base_dir(&self) -> &PathBuf {
        &self.root_dir
    }

    /// Returns the directory of the given version.
    #[inline]
    pub(crate) fn version_dir(&self, version: &str) -> PathBuf {
        self.root_dir.join(version)
    }

    /// Returns the (hidden) directory a build of `version` writes into
    /// before it gets renamed to the version directory.
    #[inline]
    pub(crate) fn staging_dir(&self, version: &str) -> PathBuf {
        self.root_dir.join(format!(".{version}{STAGING_SUFFIX}"))
    }

    /// Opens a complete version.
    ///
    /// This function fails with `VersionNotFound`, if the version
    /// directory doesn't exist or doesn't contain a manifest.
    pub(crate) fn open(&self, version: &str) -> DataverResult<VersionDir> {
        let path = self.version_dir(version);

        if version.is_empty() || !path.is_dir() {
            return Err(DataverError::VersionNotFound(format!(
                "{} (no such directory)",
                path.display()
            )));
        }

        let dir = VersionDir::new(path);
        if !dir.is_complete() {
            return Err(DataverError::VersionNotFound(format!(
                "{} (incomplete version, manifest is missing)",
                dir.root_dir().display()
            )));
        }

        Ok(dir)
    }

    /// Returns all version directories (and staging directories) of
    /// the dataset, ordered by version.
    pub(crate) fn entries(&self) -> DataverResult<Vec<VersionEntry>> {
        if !self.root_dir.is_dir() {
            return Err(DataverError::VersionNotFound(format!(
                "{} (no such dataset directory)",
                self.root_dir.display()
            )));
        }

        let mut entries = vec![];
        for entry in fs::read_dir(&self.root_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }

            let name = entry.file_name().to_string_lossy().to_string();
            let (name, staging) = match name
                .strip_prefix('.')
                .and_then(|s| s.strip_suffix(STAGING_SUFFIX))
            {
                Some(version) => (version.to_string(), true),
                None if name.starts_with('.') => continue,
                None => (name, false),
            };

            entries.push(VersionEntry {
                name,
                path: entry.path(),
                staging,
            });
        }

        entries.sort_by(|a, b| {
            compare_versions(&a.name, &b.name).then(a.staging.cmp(&b.staging))
        });

        Ok(entries)
    }
}

/// Orders two version strings. Versions, which conform to the semantic
/// versioning standard (optionally prefixed with `v`), are compared by
/// precedence; everything else is compared lexically.
pub(crate) fn compare_versions(a: &str, b: &str) -> Ordering {
    let parse = |s: &str| {
        semver::Version::parse(s.strip_prefix('v').unwrap_or(s)).ok()
    };

    match (parse(a), parse(b)) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

/// The directory of a single dataset version.
#[derive(Debug, Clone)]
pub(crate) struct VersionDir {
    root_dir: PathBuf,
}

impl VersionDir {
    pub(crate) const MANIFEST: &'static str = "manifest.json";
    pub(crate) const MANIFEST_TXT: &'static str = "manifest.txt";
    pub(crate) const METADATA: &'static str = "metadata.json";
    pub(crate) const SHARDS_DIR: &'static str = "shards";

    pub(crate) fn new<P: Into<PathBuf>>(root_dir: P) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    /// Returns the root directory of the version.
    #[inline]
    pub(crate) fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Returns the name of the version directory.
    #[inline]
    pub(crate) fn name(&self) -> String {
        self.root_dir
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    #[inline]
    pub(crate) fn manifest_path(&self) -> PathBuf {
        self.root_dir.join(Self::MANIFEST)
    }

    #[inline]
    pub(crate) fn manifest_txt_path(&self) -> PathBuf {
        self.root_dir.join(Self::MANIFEST_TXT)
    }

    #[inline]
    pub(crate) fn metadata_path(&self) -> PathBuf {
        self.root_dir.join(Self::METADATA)
    }

    #[inline]
    pub(crate) fn shards_dir(&self) -> PathBuf {
        self.root_dir.join(Self::SHARDS_DIR)
    }

    #[inline]
    pub(crate) fn shard_path(&self, file: &str) -> PathBuf {
        self.shards_dir().join(file)
    }

    /// A version is complete, iff it contains a manifest.
    #[inline]
    pub(crate) fn is_complete(&self) -> bool {
        self.manifest_path().is_file()
    }

    #[inline]
    pub(crate) fn manifest(&self) -> DataverResult<Manifest> {
        Manifest::from_path(self.manifest_path())
    }

    #[inline]
    pub(crate) fn metadata(&self) -> DataverResult<Metadata> {
        if !self.metadata_path().is_file() {
            return Err(DataverError::corrupt(format!(
                "metadata is missing ({})",
                self.metadata_path().display()
            )));
        }

        Metadata::from_path(self.metadata_path())
    }
}
