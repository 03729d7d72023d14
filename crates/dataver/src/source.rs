use std::fmt::{self, Display};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, info};
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::prelude::*;

const HF_ROWS_ENDPOINT: &str = "https://datasets-server.huggingface.co/rows";
const HF_PAGE_SIZE: usize = 100;
const HF_DEFAULT_CONFIG: &str = "default";

const PBAR_FETCH: &str =
    "Fetching rows: {human_pos}/{human_len} ({percent}%) | \
        elapsed: {elapsed_precise}{msg}";

/// Built-in source aliases: (alias, dataset, config).
const ALIASES: &[(&str, &str, Option<&str>)] = &[
    ("wikitext-2", "Salesforce/wikitext", Some("wikitext-2-raw-v1")),
    ("wikitext-2-v1", "Salesforce/wikitext", Some("wikitext-2-v1")),
    ("wikitext-103", "Salesforce/wikitext", Some("wikitext-103-raw-v1")),
    ("tiny-shakespeare", "Trelis/tiny-shakespeare", None),
];

/// A resolved source identifier.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Source {
    /// A dataset on the Hugging Face hub.
    HuggingFace {
        dataset: String,
        config: Option<String>,
    },
    /// A local JSON Lines or plain text file.
    File(PathBuf),
    /// A remote JSON Lines or plain text file.
    Url(Url),
}

/// The layout of a file source.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Format {
    JsonLines,
    PlainText,
}

impl Format {
    fn from_path(path: &str) -> Self {
        if path.ends_with(".jsonl") || path.ends_with(".ndjson") {
            Self::JsonLines
        } else {
            Self::PlainText
        }
    }
}

/// Options passed to [Source::load].
#[derive(Debug)]
pub(crate) struct LoadOptions<'a> {
    pub(crate) split: &'a str,
    pub(crate) text_field: &'a str,
    pub(crate) quiet: bool,
}

#[derive(Debug, Deserialize)]
struct RowsPage {
    rows: Vec<RowItem>,
    num_rows_total: usize,
}

#[derive(Debug, Deserialize)]
struct RowItem {
    row: Value,
}

impl Source {
    /// Resolves a source identifier.
    pub(crate) fn parse(s: &str) -> DataverResult<Self> {
        let s = s.trim();

        if let Some(rest) = s.strip_prefix("hf:") {
            let (dataset, config) = match rest.split_once(':') {
                Some((dataset, config)) if !config.is_empty() => {
                    (dataset, Some(config.to_string()))
                }
                Some((dataset, _)) => (dataset, None),
                None => (rest, None),
            };

            if dataset.is_empty() {
                return Err(DataverError::source_unavailable(format!(
                    "missing dataset in source identifier {s:?}"
                )));
            }

            return Ok(Self::HuggingFace {
                dataset: dataset.into(),
                config,
            });
        }

        if let Some(path) = s.strip_prefix("file:") {
            return Ok(Self::File(PathBuf::from(path)));
        }

        if s.starts_with("http://") || s.starts_with("https://") {
            let url = Url::parse(s).map_err(|e| {
                DataverError::source_unavailable(format!(
                    "invalid url {s:?}: {e}"
                ))
            })?;

            return Ok(Self::Url(url));
        }

        if let Some((_, dataset, config)) =
            ALIASES.iter().find(|(alias, _, _)| *alias == s)
        {
            return Ok(Self::HuggingFace {
                dataset: dataset.to_string(),
                config: config.map(str::to_string),
            });
        }

        if s.ends_with(".jsonl")
            || s.ends_with(".ndjson")
            || s.ends_with(".txt")
            || Path::new(s).is_file()
        {
            return Ok(Self::File(PathBuf::from(s)));
        }

        Err(DataverError::source_unavailable(format!(
            "unknown source identifier {s:?}"
        )))
    }

    /// Loads the raw texts of the source in their original order.
    pub(crate) fn load(
        &self,
        options: &LoadOptions<'_>,
    ) -> DataverResult<Vec<String>> {
        info!("loading {self}");

        match self {
            Self::HuggingFace { dataset, config } => {
                let config = config.as_deref().unwrap_or(HF_DEFAULT_CONFIG);
                fetch_hf_rows(dataset, config, options)
            }
            Self::File(path) => {
                let content = fs::read_to_string(path).map_err(|e| {
                    DataverError::source_unavailable(format!(
                        "unable to read {}: {e}",
                        path.display()
                    ))
                })?;

                let format = Format::from_path(&path.to_string_lossy());
                parse_texts(&content, format, options.text_field)
            }
            Self::Url(url) => {
                let content = client()?
                    .get(url.clone())
                    .send()
                    .and_then(|resp| resp.error_for_status())
                    .and_then(|resp| resp.text())
                    .map_err(|e| {
                        DataverError::source_unavailable(format!(
                            "{url}: {e}"
                        ))
                    })?;

                let format = Format::from_path(url.path());
                parse_texts(&content, format, options.text_field)
            }
        }
    }
}

impl Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HuggingFace {
                dataset,
                config: Some(config),
            } => write!(f, "huggingface dataset {dataset} ({config})"),
            Self::HuggingFace { dataset, .. } => {
                write!(f, "huggingface dataset {dataset}")
            }
            Self::File(path) => write!(f, "file {}", path.display()),
            Self::Url(url) => write!(f, "url {url}"),
        }
    }
}

fn client() -> DataverResult<Client> {
    Client::builder()
        .user_agent(concat!("dataver/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(60))
        .build()
        .map_err(DataverError::source_unavailable)
}

/// Returns the text of a JSON record. A missing or `null` field is
/// treated as an empty text.
fn text_of(value: &Value, field: &str) -> Option<String> {
    if !value.is_object() {
        return None;
    }

    match value.get(field) {
        None | Some(Value::Null) => Some(String::new()),
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => None,
    }
}

fn parse_texts(
    content: &str,
    format: Format,
    text_field: &str,
) -> DataverResult<Vec<String>> {
    match format {
        Format::PlainText => {
            Ok(content.lines().map(str::to_string).collect())
        }
        Format::JsonLines => content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(idx, line)| {
                serde_json::from_str::<Value>(line)
                    .ok()
                    .and_then(|value| text_of(&value, text_field))
                    .ok_or_else(|| {
                        DataverError::source_unavailable(format!(
                            "malformed record in line {}",
                            idx + 1
                        ))
                    })
            })
            .collect(),
    }
}

fn fetch_hf_rows(
    dataset: &str,
    config: &str,
    options: &LoadOptions<'_>,
) -> DataverResult<Vec<String>> {
    let client = client()?;
    let pbar = ProgressBarBuilder::new(PBAR_FETCH, options.quiet).build();
    let mut texts = vec![];
    let mut offset = 0;

    loop {
        let mut url = Url::parse(HF_ROWS_ENDPOINT)
            .map_err(DataverError::source_unavailable)?;
        url.query_pairs_mut()
            .append_pair("dataset", dataset)
            .append_pair("config", config)
            .append_pair("split", options.split)
            .append_pair("offset", &offset.to_string())
            .append_pair("length", &HF_PAGE_SIZE.to_string());

        debug!("GET {url}");

        let page: RowsPage = client
            .get(url)
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.json())
            .map_err(|e| {
                DataverError::source_unavailable(format!(
                    "{dataset} ({config}, split = {}): {e}",
                    options.split
                ))
            })?;

        pbar.set_length(page.num_rows_total as u64);

        for (idx, item) in page.rows.iter().enumerate() {
            let text =
                text_of(&item.row, options.text_field).ok_or_else(|| {
                    DataverError::source_unavailable(format!(
                        "row {} has a non-string field `{}`",
                        offset + idx,
                        options.text_field
                    ))
                })?;

            texts.push(text);
        }

        offset += page.rows.len();
        pbar.set_position(offset as u64);

        if page.rows.is_empty() || offset >= page.num_rows_total {
            break;
        }
    }

    pbar.finish_and_clear();
    Ok(texts)
}
