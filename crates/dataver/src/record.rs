use hashbrown::HashSet;
use serde::{Deserialize, Serialize};

use crate::config::{Filters, Processing};

/// A single text record; serialized as one line of a shard.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub(crate) struct Record {
    pub(crate) text: String,
}

impl Record {
    pub(crate) fn new<S: Into<String>>(text: S) -> Self {
        Self { text: text.into() }
    }

    /// Returns the number of characters (not bytes) of the text.
    #[inline]
    pub(crate) fn strlen(&self) -> usize {
        self.text.chars().count()
    }

    /// Returns a rough token count (whitespace separated words).
    #[inline]
    pub(crate) fn num_tokens(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

/// Cleans a raw text according to the processing options.
pub(crate) fn clean_text(text: &str, processing: &Processing) -> String {
    let mut text = text.to_string();

    if processing.strip_empty_lines {
        text = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n");
    }

    if processing.normalize_whitespace {
        text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    }

    text
}

/// Returns true, if the (cleaned) text satisfies the length bounds.
#[inline]
fn keep(record: &Record, filters: &Filters) -> bool {
    let n = record.strlen();
    n >= filters.min_chars && n <= filters.max_chars
}

/// The outcome of [process].
#[derive(Debug, Default)]
pub(crate) struct Processed {
    pub(crate) records: Vec<Record>,
    pub(crate) num_raw: usize,
    pub(crate) num_duplicates: usize,
}

/// Cleans, filters, de-duplicates and truncates the raw texts. The
/// relative order of the kept records is the order of the input.
pub(crate) fn process<I>(
    raw: I,
    processing: &Processing,
    filters: &Filters,
) -> Processed
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    let mut result = Processed::default();

    for text in raw {
        result.num_raw += 1;

        if filters.limit.is_some_and(|n| result.records.len() >= n) {
            continue;
        }

        let record = Record::new(clean_text(&text, processing));
        if !keep(&record, filters) {
            continue;
        }

        if filters.dedup && !seen.insert(record.text.clone()) {
            result.num_duplicates += 1;
            continue;
        }

        result.records.push(record);
    }

    result
}
