use std::fs;
use std::path::PathBuf;

use clap::Parser;
use log::info;

use crate::cli::Verbosity;
use crate::prelude::*;

/// Remove a version (or the leftovers of an interrupted build).
#[derive(Debug, Parser)]
pub(crate) struct Remove {
    #[command(flatten)]
    pub(crate) verbosity: Verbosity,

    /// The directory of the dataset, which contains one directory per
    /// version.
    #[arg(
        long,
        alias = "base_dir",
        env = "DATAVER_BASE_DIR",
        value_name = "path"
    )]
    base_dir: PathBuf,

    /// The version to remove.
    #[arg(long, value_name = "version")]
    version: String,
}

/// Removes the version directory and a staging directory of the same
/// version. Returns the removed paths.
fn remove_version(
    dataset: &DatasetDir,
    version: &str,
) -> DataverResult<Vec<PathBuf>> {
    if version.is_empty()
        || version.starts_with('.')
        || version.contains(['/', '\\'])
    {
        return Err(DataverError::VersionNotFound(version.into()));
    }

    let removed: Vec<PathBuf> =
        [dataset.version_dir(version), dataset.staging_dir(version)]
            .into_iter()
            .filter(|path| path.is_dir())
            .collect();

    if removed.is_empty() {
        return Err(DataverError::VersionNotFound(format!(
            "{} (no such directory)",
            dataset.version_dir(version).display()
        )));
    }

    for path in removed.iter() {
        info!("remove {}", path.display());
        fs::remove_dir_all(path)?;
    }

    Ok(removed)
}

impl Remove {
    pub(crate) fn execute(self) -> DataverResult<()> {
        let dataset = DatasetDir::new(&self.base_dir);
        let removed = remove_version(&dataset, &self.version)?;

        if !self.verbosity.quiet {
            for path in removed {
                eprintln!("Removed {}.", path.display());
            }
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

    #[test]
    fn remove_built_version() -> TestResult {
        let tmp = tempfile::tempdir()?;
        let source = corpus(tmp.path(), 3)?;
        let config = config(tmp.path(), &source, 2);
        let options = BuildOptions {
            force: false,
            quiet: true,
        };

        let report = build(&config, &options)?;
        let dataset = DatasetDir::new(config.dataset_dir());
        fs::create_dir_all(dataset.staging_dir("v1.0.0"))?;

        let removed = remove_version(&dataset, "v1.0.0")?;
        assert_eq!(removed.len(), 2);
        assert!(!report.dir.root_dir().exists());
        assert!(!dataset.staging_dir("v1.0.0").exists());

        // the dataset directory itself is kept
        assert!(dataset.base_dir().is_dir());
        assert!(dataset.entries()?.is_empty());

        Ok(())
    }

    #[test]
    fn remove_unknown_version() -> TestResult {
        let tmp = tempfile::tempdir()?;
        let dataset = DatasetDir::new(tmp.path());

        assert!(matches!(
            remove_version(&dataset, "v9.9.9"),
            Err(DataverError::VersionNotFound(_))
        ));
        assert!(matches!(
            remove_version(&dataset, ".."),
            Err(DataverError::VersionNotFound(_))
        ));

        Ok(())
    }
}
