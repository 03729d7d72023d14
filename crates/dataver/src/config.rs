use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DataverError, DataverResult};

pub(crate) const DEFAULT_BASE_DIR: &str = "data/versions";

/// Build config of a single dataset version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Config {
    /// The path of the config.
    #[serde(skip)]
    path: PathBuf,

    /// The name of the dataset.
    pub(crate) dataset_name: String,

    /// The version to build, e.g. `v1.0.0`.
    pub(crate) version: String,

    /// The source identifier (see [crate::source::Source]).
    pub(crate) source: String,

    /// The split of the source to load.
    #[serde(default = "default_split")]
    pub(crate) split: String,

    /// The field of a JSON record which holds the text.
    #[serde(default = "default_text_field")]
    pub(crate) text_field: String,

    /// Maximum number of records per shard.
    pub(crate) shard_size: u64,

    /// Optional upper bound of the shard size in bytes.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub(crate) max_shard_bytes: Option<u64>,

    /// The root of all versioned datasets.
    #[serde(default = "default_base_dir")]
    pub(crate) base_dir: PathBuf,

    /// A short blurb about the version.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub(crate) description: Option<String>,

    /// What to do, if the version directory already exists.
    #[serde(default)]
    pub(crate) on_existing: OnExisting,

    #[serde(default)]
    pub(crate) filters: Filters,

    #[serde(default)]
    pub(crate) processing: Processing,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) enum OnExisting {
    #[default]
    Fail,
    Overwrite,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct Filters {
    /// Minimum number of characters of a (cleaned) text.
    pub(crate) min_chars: usize,

    /// Maximum number of characters of a (cleaned) text.
    pub(crate) max_chars: usize,

    /// Whether to drop exact duplicates or not.
    pub(crate) dedup: bool,

    /// Keep at most `limit` records.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) limit: Option<usize>,
}

impl Default for Filters {
    fn default() -> Self {
        Self {
            min_chars: 0,
            max_chars: 10_000_000,
            dedup: false,
            limit: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct Processing {
    pub(crate) strip_empty_lines: bool,
    pub(crate) normalize_whitespace: bool,
}

impl Default for Processing {
    fn default() -> Self {
        Self {
            strip_empty_lines: true,
            normalize_whitespace: true,
        }
    }
}

fn default_split() -> String {
    "train".into()
}

fn default_text_field() -> String {
    "text".into()
}

fn default_base_dir() -> PathBuf {
    PathBuf::from(DEFAULT_BASE_DIR)
}

/// Checks that `value` can be used as a single path component.
fn check_component(key: &str, value: &str) -> DataverResult<()> {
    if value.trim().is_empty() {
        return Err(DataverError::invalid_config(format!(
            "`{key}` must not be empty"
        )));
    }

    if value.starts_with('.')
        || value.contains(['/', '\\'])
        || value.chars().any(char::is_control)
    {
        return Err(DataverError::invalid_config(format!(
            "`{key}` must be a plain directory name (got {value:?})"
        )));
    }

    Ok(())
}

/// Returns true, if the version looks like a semantic version. A
/// leading `v` is ignored.
pub(crate) fn is_semver_like(version: &str) -> bool {
    let version = version.strip_prefix('v').unwrap_or(version);
    semver::Version::parse(version).is_ok()
}

impl Config {
    /// Creates a new config with default values, which will be saved
    /// at `path`.
    pub(crate) fn create<P, S>(
        path: P,
        dataset_name: S,
        version: S,
        source: S,
        shard_size: u64,
    ) -> Self
    where
        P: AsRef<Path>,
        S: Into<String>,
    {
        Self {
            path: path.as_ref().into(),
            dataset_name: dataset_name.into(),
            version: version.into(),
            source: source.into(),
            split: default_split(),
            text_field: default_text_field(),
            shard_size,
            max_shard_bytes: None,
            base_dir: default_base_dir(),
            description: None,
            on_existing: OnExisting::default(),
            filters: Filters::default(),
            processing: Processing::default(),
        }
    }

    /// Loads and validates an existing config from a path.
    pub(crate) fn from_path<P>(path: P) -> DataverResult<Self>
    where
        P: AsRef<Path>,
    {
        let path: PathBuf = path.as_ref().into();
        let content = fs::read_to_string(&path).map_err(|e| {
            DataverError::invalid_config(format!(
                "unable to read {}: {e}",
                path.display()
            ))
        })?;

        let mut config = Self::from_toml(&content).map_err(|e| match e {
            DataverError::InvalidConfig(msg) => {
                DataverError::invalid_config(format!(
                    "{}: {msg}",
                    path.display()
                ))
            }
            e => e,
        })?;

        config.path = path;
        Ok(config)
    }

    /// Parses and validates a config from its TOML representation.
    pub(crate) fn from_toml(s: &str) -> DataverResult<Self> {
        let config: Self = toml::from_str(s)
            .map_err(|e| DataverError::invalid_config(e.message()))?;

        config.validate()?;
        Ok(config)
    }

    /// Checks the constraints, which can't be expressed by the types.
    pub(crate) fn validate(&self) -> DataverResult<()> {
        check_component("dataset_name", &self.dataset_name)?;
        check_component("version", &self.version)?;

        if self.source.trim().is_empty() {
            return Err(DataverError::invalid_config(
                "`source` must not be empty",
            ));
        }

        if self.shard_size == 0 {
            return Err(DataverError::invalid_config(
                "`shard_size` must be greater than 0",
            ));
        }

        if self.max_shard_bytes == Some(0) {
            return Err(DataverError::invalid_config(
                "`max_shard_bytes` must be greater than 0",
            ));
        }

        if self.text_field.is_empty() {
            return Err(DataverError::invalid_config(
                "`text_field` must not be empty",
            ));
        }

        if self.filters.min_chars > self.filters.max_chars {
            return Err(DataverError::invalid_config(format!(
                "`filters.min_chars` ({}) exceeds `filters.max_chars` ({})",
                self.filters.min_chars, self.filters.max_chars
            )));
        }

        Ok(())
    }

    /// Returns the location of the config.
    #[inline]
    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the directory of the dataset, which holds all versions.
    #[inline]
    pub(crate) fn dataset_dir(&self) -> PathBuf {
        self.base_dir.join(&self.dataset_name)
    }

    /// Saves the config.
    pub(crate) fn save(&self) -> DataverResult<()> {
        let content = toml::to_string(self)?;
        let mut out = File::create(&self.path)?;
        out.write_all(content.as_bytes())?;
        Ok(())
    }
}
