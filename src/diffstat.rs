//! Numstat parsing and byte estimation.
//!
//! Byte figures produced here are estimates: every added or deleted line is
//! assumed to weigh `bytes_per_line` bytes (default 50). Real blob sizes are
//! only fetched when a rename crosses an exclusion boundary (see `exclude`),
//! so estimated and measured bytes coexist in downstream cumulative totals.

use crate::classify;
use crate::error::{GitPulseError, Result};
use crate::model::FileChange;
use log::debug;
use std::collections::HashMap;

/// One raw `<added>\t<deleted>\t<path>` entry; `None` counts mark a binary
/// file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatLine {
    pub added: Option<u64>,
    pub deleted: Option<u64>,
    pub path: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileBytes {
    pub added: u64,
    pub deleted: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ByteChanges {
    pub total_added: u64,
    pub total_deleted: u64,
    pub per_file: HashMap<String, FileBytes>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedDiff {
    pub lines_added: u64,
    pub lines_deleted: u64,
    pub bytes_added: u64,
    pub bytes_deleted: u64,
    pub files: Vec<FileChange>,
}

/// Parse one commit's numstat block. Malformed lines are skipped, never
/// fatal.
pub fn parse_stat_lines(block: &str) -> Vec<StatLine> {
    let mut lines = Vec::new();
    for raw in block.lines() {
        if raw.is_empty() {
            continue;
        }
        let mut fields = raw.splitn(3, '\t');
        let (Some(added), Some(deleted), Some(path)) =
            (fields.next(), fields.next(), fields.next())
        else {
            debug!("skipping malformed stat line: {raw:?}");
            continue;
        };
        if path.is_empty() {
            debug!("skipping stat line without a path: {raw:?}");
            continue;
        }
        match (parse_count(added), parse_count(deleted)) {
            (Some(added), Some(deleted)) => lines.push(StatLine {
                added,
                deleted,
                path: path.to_string(),
            }),
            _ => debug!("skipping stat line with non-numeric counts: {raw:?}"),
        }
    }
    lines
}

fn parse_count(field: &str) -> Option<Option<u64>> {
    if field == "-" {
        return Some(None);
    }
    field.parse::<u64>().ok().map(Some)
}

/// Estimate byte churn for one commit's numstat block: every counted line
/// weighs `bytes_per_line` bytes. Binary (`-`) entries contribute nothing and
/// are absent from the per-file map.
pub fn parse_byte_changes(block: &str, bytes_per_line: u64) -> ByteChanges {
    let mut changes = ByteChanges::default();
    for line in parse_stat_lines(block) {
        let (Some(added), Some(deleted)) = (line.added, line.deleted) else {
            continue;
        };
        let bytes = FileBytes {
            added: added * bytes_per_line,
            deleted: deleted * bytes_per_line,
        };
        changes.total_added += bytes.added;
        changes.total_deleted += bytes.deleted;
        changes.per_file.insert(line.path, bytes);
    }
    changes
}

/// Turn one commit's stat section into typed file changes with estimated
/// bytes. A missing section (as opposed to an empty one, which is a
/// legitimate empty or merge commit) means the source never produced a diff
/// summary, which is a caller bug, not a runtime condition.
pub fn build_parsed_diff(
    sha: &str,
    stat_block: Option<&str>,
    bytes_per_line: u64,
) -> Result<ParsedDiff> {
    let block = stat_block.ok_or_else(|| {
        GitPulseError::Contract(format!("commit {sha}: diff summary has no file list"))
    })?;

    let bytes = parse_byte_changes(block, bytes_per_line);
    let mut diff = ParsedDiff::default();

    for line in parse_stat_lines(block) {
        let file_type = classify::file_type(&line.path);
        // Binary files never contribute line counts, even when the stat
        // source reported some for a binary-classified extension.
        let (lines_added, lines_deleted) = match (line.added, line.deleted) {
            (Some(added), Some(deleted)) if file_type != classify::BINARY_TYPE => (added, deleted),
            _ => (0, 0),
        };
        let file_bytes = bytes.per_file.get(&line.path).copied().unwrap_or_default();

        diff.lines_added += lines_added;
        diff.lines_deleted += lines_deleted;
        diff.bytes_added += file_bytes.added;
        diff.bytes_deleted += file_bytes.deleted;
        diff.files.push(FileChange {
            path: line.path,
            lines_added,
            lines_deleted,
            file_type: file_type.to_string(),
            bytes_added: file_bytes.added,
            bytes_deleted: file_bytes.deleted,
        });
    }

    Ok(diff)
}
