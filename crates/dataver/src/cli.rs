use clap::{Parser, Subcommand};
use log::LevelFilter;

use crate::commands::*;

#[derive(Debug, Parser)]
#[command(version, about, long_about = None, max_term_width = 72)]
pub(crate) struct Args {
    /// Number of threads to use. If this options isn't set or a value
    /// of "0" is chosen, the maximum number of available threads
    /// is used.
    #[clap(
        short = 'j',
        long,
        env = "DATAVER_NUM_JOBS",
        hide_env_values = true
    )]
    pub(crate) num_jobs: Option<usize>,

    #[command(subcommand)]
    pub(crate) cmd: Command,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    Archive(Archive),
    Build(Build),
    Completions(Completions),
    Init(Init),
    #[clap(alias = "show")]
    Inspect(Inspect),
    #[clap(alias = "ls")]
    List(List),
    #[clap(visible_alias = "rm")]
    Remove(Remove),
    Verify(Verify),
}

#[derive(Debug, Default, Clone, clap::Args)]
pub(crate) struct Verbosity {
    /// Run verbosely. Print additional progress information to the
    /// standard error stream. This option conflicts with the
    /// `--quiet` option.
    #[arg(short, long, conflicts_with = "quiet")]
    pub(crate) verbose: bool,

    /// Operate quietly; do not show progress. This option conflicts
    /// with the `--verbose` option.
    #[arg(short, long, conflicts_with = "verbose")]
    pub(crate) quiet: bool,
}

impl Verbosity {
    pub(crate) fn level_filter(&self) -> LevelFilter {
        if self.verbose {
            LevelFilter::Info
        } else if self.quiet {
            LevelFilter::Error
        } else {
            LevelFilter::Warn
        }
    }
}

impl Command {
    pub(crate) fn verbosity(&self) -> Option<&Verbosity> {
        match self {
            Self::Archive(cmd) => Some(&cmd.verbosity),
            Self::Build(cmd) => Some(&cmd.verbosity),
            Self::Completions(_) => None,
            Self::Init(cmd) => Some(&cmd.verbosity),
            Self::Inspect(cmd) => Some(&cmd.verbosity),
            Self::List(cmd) => Some(&cmd.verbosity),
            Self::Remove(cmd) => Some(&cmd.verbosity),
            Self::Verify(cmd) => Some(&cmd.verbosity),
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    type TestResult = anyhow::Result<()>;

    #[test]
    fn verify_cli() {
        Args::command().debug_assert();
    }

    #[test]
    fn build_args() -> TestResult {
        let args = Args::try_parse_from([
            "dataver",
            "build",
            "--config",
            "configs/dataset-v1.0.0.toml",
            "-q",
        ])?;

        let Command::Build(cmd) = args.cmd else {
            anyhow::bail!("expected build command");
        };

        assert!(cmd.verbosity.quiet);
        assert_eq!(cmd.verbosity.level_filter(), LevelFilter::Error);
        Ok(())
    }

    #[test]
    fn inspect_accepts_underscore_spelling() -> TestResult {
        let args = Args::try_parse_from([
            "dataver",
            "inspect",
            "--base_dir",
            "data/versions/demo-wikitext",
            "--version",
            "v1.0.0",
        ])?;

        assert!(matches!(args.cmd, Command::Inspect(_)));
        Ok(())
    }

    #[test]
    fn verbose_conflicts_with_quiet() {
        let result = Args::try_parse_from([
            "dataver", "list", "--base-dir", "x", "-v", "-q",
        ]);

        assert!(result.is_err());
    }
}
