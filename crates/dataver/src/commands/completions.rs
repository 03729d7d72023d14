use std::fs::File;
use std::io::{stdout, Write};
use std::path::PathBuf;

use clap::CommandFactory;
use clap_complete::{generate, Shell};

use crate::cli::Args;
use crate::prelude::*;

const BIN_NAME: &str = "dataver";

/// Generate completion scripts for various shells.
#[derive(Debug, clap::Parser)]
pub(crate) struct Completions {
    /// Write output to `filename` instead of `stdout`.
    #[arg(long, short, value_name = "filename")]
    output: Option<PathBuf>,

    /// Shell for which a completion script is to be generated.
    #[arg(value_name = "shell")]
    shell: Shell,
}

fn completions<W: Write>(shell: Shell, wtr: &mut W) -> DataverResult<()> {
    let mut cmd = Args::command();
    generate(shell, &mut cmd, BIN_NAME, wtr);
    wtr.flush()?;
    Ok(())
}

impl Completions {
    pub(crate) fn execute(self) -> DataverResult<()> {
        let mut wtr: Box<dyn Write> = match self.output {
            Some(path) => Box::new(File::create(path)?),
            None => Box::new(stdout().lock()),
        };

        completions(self.shell, &mut wtr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult = anyhow::Result<()>;

    #[test]
    fn bash_completions() -> TestResult {
        let mut buf = Vec::new();
        completions(Shell::Bash, &mut buf)?;

        let script = String::from_utf8(buf)?;
        assert!(script.contains("dataver"));
        assert!(script.contains("verify"));
        assert!(script.contains("--base-dir"));

        Ok(())
    }
}
