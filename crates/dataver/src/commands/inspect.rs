use std::path::PathBuf;

use clap::Parser;
use comfy_table::{presets, Row, Table};
use humansize::{format_size, BINARY};

use crate::cli::Verbosity;
use crate::inspector::{inspect, Summary};
use crate::prelude::*;

const SAMPLE_CHARS: usize = 500;

/// Print a summary of a dataset version.
#[derive(Debug, Parser)]
pub(crate) struct Inspect {
    #[command(flatten)]
    pub(crate) verbosity: Verbosity,

    /// Print one row per shard.
    #[arg(long)]
    shards: bool,

    /// Print a random record out of a random shard.
    #[arg(long)]
    sample: bool,

    /// The directory of the dataset, which contains one directory per
    /// version (e.g. `data/versions/demo-wikitext`).
    #[arg(
        long,
        alias = "base_dir",
        env = "DATAVER_BASE_DIR",
        value_name = "path"
    )]
    base_dir: PathBuf,

    /// The version to inspect, e.g. `v1.0.0`.
    #[arg(long, value_name = "version")]
    version: String,
}

fn metadata_table(summary: &Summary) -> DataverResult<Table> {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_header(Row::from(vec!["key", "value"]));

    for (key, value) in summary.metadata.fields()? {
        table.add_row(vec![key, value]);
    }

    Ok(table)
}

fn shards_table(summary: &Summary) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_header(Row::from(vec!["shard", "records", "size", "sha256"]));

    for shard in summary.manifest.shards.iter() {
        table.add_row(vec![
            shard.file.clone(),
            shard.num_records.to_string(),
            format_size(shard.num_bytes, BINARY),
            shard.sha256.clone(),
        ]);
    }

    table
}

impl Inspect {
    pub(crate) fn execute(self) -> DataverResult<()> {
        let dataset = DatasetDir::new(&self.base_dir);
        let summary = inspect(&dataset, &self.version)?;
        let manifest = &summary.manifest;

        println!("{}", metadata_table(&summary)?);
        println!(
            "\n{} version {}: {} shards, {} records, {}",
            manifest.dataset_name,
            manifest.version,
            summary.num_shards(),
            summary.total_records(),
            format_size(manifest.total_bytes, BINARY)
        );
        println!("sha256: {}", manifest.sha256);

        if self.shards && summary.num_shards() > 0 {
            println!("\n{}", shards_table(&summary));
        }

        if self.sample {
            match summary.sample(&mut rand::thread_rng())? {
                Some((file, record)) => {
                    let text: String =
                        record.text.chars().take(SAMPLE_CHARS).collect();
                    let ellipsis = if record.strlen() > SAMPLE_CHARS {
                        " ..."
                    } else {
                        ""
                    };

                    println!("\nRandom sample from {file}:\n{text}{ellipsis}");
                }
                None => println!("\nNo shards found in manifest."),
            }
        }

        Ok(())
    }
}
