use std::fs::File;
use std::io::{BufWriter, Write};
use std::ops::Range;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::manifest::ShardEntry;
use crate::prelude::*;
use crate::utils::to_hex;

/// Returns the file name of the shard with the given index.
#[inline]
pub(crate) fn shard_file_name(index: usize) -> String {
    format!("part-{index:05}.jsonl")
}

/// Partitions a sequence of lines into consecutive shards.
///
/// The items of `line_sizes` are the sizes of the serialized records
/// in bytes (without the line terminator). A shard is closed as soon
/// as it holds `max_records` records or if the next line wouldn't fit
/// into `max_bytes`. A single line exceeding `max_bytes` makes up a
/// shard on its own. Empty shards are never produced.
pub(crate) fn plan_shards<I>(
    line_sizes: I,
    max_records: u64,
    max_bytes: Option<u64>,
) -> Vec<Range<usize>>
where
    I: IntoIterator<Item = u64>,
{
    let mut shards = vec![];
    let mut start = 0;
    let mut count = 0u64;
    let mut bytes = 0u64;
    let mut end = 0;

    for (idx, size) in line_sizes.into_iter().enumerate() {
        let size = size + 1;

        let full = count >= max_records
            || max_bytes.is_some_and(|max| count > 0 && bytes + size > max);

        if full {
            shards.push(start..idx);
            start = idx;
            count = 0;
            bytes = 0;
        }

        count += 1;
        bytes += size;
        end = idx + 1;
    }

    if count > 0 {
        shards.push(start..end);
    }

    shards
}

/// Writes the lines of a shard into `dir` and returns the manifest
/// entry of the shard. The file is synced to disk before returning.
pub(crate) fn write_shard<P, S>(
    dir: P,
    index: usize,
    lines: &[S],
) -> DataverResult<ShardEntry>
where
    P: AsRef<Path>,
    S: AsRef<str>,
{
    let file_name = shard_file_name(index);
    let file = File::create_new(dir.as_ref().join(&file_name))?;
    let mut out = BufWriter::new(file);
    let mut hasher = Sha256::new();
    let mut num_bytes = 0u64;

    for line in lines.iter() {
        let line = line.as_ref().as_bytes();
        out.write_all(line)?;
        out.write_all(b"\n")?;

        hasher.update(line);
        hasher.update(b"\n");
        num_bytes += line.len() as u64 + 1;
    }

    let file = out.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;

    Ok(ShardEntry {
        file: file_name,
        num_records: lines.len() as u64,
        num_bytes,
        sha256: to_hex(&hasher.finalize()),
    })
}
