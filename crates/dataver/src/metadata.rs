use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{Filters, Processing};
use crate::prelude::*;

/// Provenance of a dataset version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct Metadata {
    pub(crate) version: String,
    pub(crate) dataset_name: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub(crate) description: Option<String>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) builder: String,
    pub(crate) source: String,
    pub(crate) resolved_source: String,
    pub(crate) split: String,
    pub(crate) text_field: String,
    pub(crate) filters: Filters,
    pub(crate) processing: Processing,
    pub(crate) shard_size: u64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub(crate) max_shard_bytes: Option<u64>,
    pub(crate) num_raw_examples: u64,
    pub(crate) num_examples: u64,
    #[serde(default)]
    pub(crate) num_duplicates: u64,
    pub(crate) num_shards: u64,
    pub(crate) estimated_num_tokens: u64,
    pub(crate) config_path: PathBuf,
}

impl Metadata {
    /// Returns the name and version of this tool.
    pub(crate) fn builder() -> String {
        format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
    }

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

    pub(crate) fn save<P: AsRef<Path>>(&self, path: P) -> DataverResult<()> {
        let mut out = BufWriter::new(File::create_new(path)?);
        serde_json::to_writer_pretty(&mut out, self)?;
        out.write_all(b"\n")?;

        let file = out.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        Ok(())
    }

    /// Returns the metadata as a flat list of key-value pairs in the
    /// order of the JSON representation. Nested objects are rendered
    /// as compact JSON.
    pub(crate) fn fields(&self) -> DataverResult<Vec<(String, String)>> {
        let Value::Object(map) = serde_json::to_value(self)? else {
            return Ok(vec![]);
        };

        Ok(map
            .into_iter()
            .map(|(key, value)| {
                let value = match value {
                    Value::String(s) => s,
                    Value::Null => String::new(),
                    value => value.to_string(),
                };

                (key, value)
            })
            .collect())
    }

    /// Returns the creation time in RFC 3339 format.
    pub(crate) fn created_at(&self) -> String {
        self.created_at.to_rfc3339_opts(SecondsFormat::Secs, true)
    }
}
