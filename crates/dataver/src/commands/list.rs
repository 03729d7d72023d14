use std::path::PathBuf;

use clap::Parser;
use comfy_table::{presets, Row, Table};
use humansize::{format_size, BINARY};

use crate::cli::Verbosity;
use crate::inspector::inspect;
use crate::prelude::*;
use crate::store::VersionEntry;

/// List all versions of a dataset.
#[derive(Debug, Parser)]
pub(crate) struct List {
    #[command(flatten)]
    pub(crate) verbosity: Verbosity,

    /// Include leftovers of interrupted builds (staging directories).
    #[arg(short, long)]
    all: bool,

    /// The directory of the dataset, which contains one directory per
    /// version.
    #[arg(
        long,
        alias = "base_dir",
        env = "DATAVER_BASE_DIR",
        value_name = "path"
    )]
    base_dir: PathBuf,
}

#[derive(Debug, PartialEq)]
enum State {
    Complete,
    Incomplete,
    Staging,
    Corrupt,
}

impl State {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Complete => "complete",
            Self::Incomplete => "incomplete",
            Self::Staging => "staging",
            Self::Corrupt => "corrupt",
        }
    }
}

#[derive(Debug)]
struct Listing {
    name: String,
    state: State,
    shards: Option<usize>,
    records: Option<u64>,
    size: Option<u64>,
    created: Option<String>,
}

fn listing(dataset: &DatasetDir, entry: VersionEntry) -> Listing {
    let mut listing = Listing {
        name: entry.name,
        state: State::Staging,
        shards: None,
        records: None,
        size: None,
        created: None,
    };

    if entry.staging {
        return listing;
    }

    if !VersionDir::new(&entry.path).is_complete() {
        listing.state = State::Incomplete;
        return listing;
    }

    match inspect(dataset, &listing.name) {
        Ok(summary) => {
            listing.state = State::Complete;
            listing.shards = Some(summary.num_shards());
            listing.records = Some(summary.total_records());
            listing.size = Some(summary.manifest.total_bytes);
            listing.created = Some(summary.metadata.created_at());
        }
        Err(e) => {
            log::warn!("version {} is corrupt: {e}", listing.name);
            listing.state = State::Corrupt;
        }
    }

    listing
}

fn listings(dataset: &DatasetDir, all: bool) -> DataverResult<Vec<Listing>> {
    Ok(dataset
        .entries()?
        .into_iter()
        .filter(|entry| all || !entry.staging)
        .map(|entry| listing(dataset, entry))
        .collect())
}

impl List {
    pub(crate) fn execute(self) -> DataverResult<()> {
        let dataset = DatasetDir::new(&self.base_dir);
        let listings = listings(&dataset, self.all)?;

        if listings.is_empty() {
            if !self.verbosity.quiet {
                eprintln!(
                    "No versions found in {}.",
                    dataset.base_dir().display()
                );
            }

            return Ok(());
        }

        let mut table = Table::new();
        table.load_preset(presets::UTF8_FULL_CONDENSED);
        table.set_header(Row::from(vec![
            "version", "state", "shards", "records", "size", "created",
        ]));

        let or_dash =
            |value: Option<String>| value.unwrap_or_else(|| "-".into());

        for listing in listings {
            table.add_row(vec![
                listing.name,
                listing.state.as_str().to_string(),
                or_dash(listing.shards.map(|n| n.to_string())),
                or_dash(listing.records.map(|n| n.to_string())),
                or_dash(listing.size.map(|n| format_size(n, BINARY))),
                or_dash(listing.created),
            ]);
        }

        println!("{table}");
        Ok(())
    }
}
