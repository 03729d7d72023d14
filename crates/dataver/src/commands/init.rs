use std::path::PathBuf;

use clap::Parser;
use log::info;

use crate::cli::Verbosity;
use crate::prelude::*;

/// Create a new build config.
#[derive(Debug, Parser)]
pub(crate) struct Init {
    #[command(flatten)]
    pub(crate) verbosity: Verbosity,

    /// The name of the dataset.
    #[arg(short, long, default_value = "demo-wikitext")]
    name: String,

    /// The version to build.
    #[arg(long, default_value = "v1.0.0")]
    version: String,

    /// The source of the records; a known alias (e.g. `wikitext-2`),
    /// a Hugging Face dataset (`hf:<dataset>[:<config>]`), a local
    /// file or a URL.
    #[arg(short, long, default_value = "wikitext-2")]
    source: String,

    /// The maximum number of records per shard.
    #[arg(long, default_value = "1000")]
    shard_size: u64,

    /// A short blurb about the dataset version.
    #[arg(short, long)]
    description: Option<String>,

    /// Whether to overwrite an existing config or not.
    #[arg(short, long)]
    force: bool,

    /// The location of the config.
    #[arg(default_value = "configs/dataset-v1.0.0.toml")]
    path: PathBuf,
}

impl Init {
    pub(crate) fn execute(self) -> DataverResult<()> {
        if self.path.exists() && !self.force {
            bail!(
                "config {} already exists (use --force to overwrite)",
                self.path.display()
            );
        }

        let mut config = Config::create(
            &self.path,
            self.name,
            self.version,
            self.source,
            self.shard_size,
        );
        config.description = self.description;
        config.validate()?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.is_dir() {
                info!("create directory {}", parent.display());
                std::fs::create_dir_all(parent)?;
            }
        }

        config.save()?;

        if !self.verbosity.quiet {
            eprintln!("Created config {}.", self.path.display());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    type TestResult = anyhow::Result<()>;

    fn init(args: &[&str]) -> anyhow::Result<Init> {
        let mut argv = vec!["init", "-q"];
        argv.extend(args);
        Ok(Init::try_parse_from(argv)?)
    }

    #[test]
    fn create_config() -> TestResult {
        let tmp = tempfile::tempdir()?;
        let path = tmp.path().join("configs/dataset-v2.0.0.toml");
        let path_str = path.to_string_lossy().to_string();

        init(&[
            "--version",
            "v2.0.0",
            "--source",
            "tiny-shakespeare",
            "--shard-size",
            "50",
            &path_str,
        ])?
        .execute()?;

        let config = Config::from_path(&path)?;
        assert_eq!(config.dataset_name, "demo-wikitext");
        assert_eq!(config.version, "v2.0.0");
        assert_eq!(config.source, "tiny-shakespeare");
        assert_eq!(config.shard_size, 50);
        assert_eq!(config.split, "train");

        Ok(())
    }

    #[test]
    fn existing_config() -> TestResult {
        let tmp = tempfile::tempdir()?;
        let path = tmp.path().join("dataset.toml");
        let path_str = path.to_string_lossy().to_string();
        std::fs::write(&path, "")?;

        assert!(init(&[&path_str])?.execute().is_err());
        assert_eq!(std::fs::read_to_string(&path)?, "");

        init(&["--force", "--name", "shakespeare", &path_str])?.execute()?;
        assert_eq!(Config::from_path(&path)?.dataset_name, "shakespeare");

        Ok(())
    }

    #[test]
    fn invalid_name() -> TestResult {
        let tmp = tempfile::tempdir()?;
        let path = tmp.path().join("dataset.toml");
        let path_str = path.to_string_lossy().to_string();

        assert!(matches!(
            init(&["--name", "../escape", &path_str])?.execute(),
            Err(DataverError::InvalidConfig(_))
        ));
        assert!(!path.exists());

        Ok(())
    }
}
