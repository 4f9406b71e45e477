//! Path exclusion and rename-boundary correction.
//!
//! The diff reported for a rename only covers the edit made at the rename
//! commit. When the rename crosses the exclusion boundary the file's full
//! prior size silently enters or leaves the measured tree, so the resolver
//! fetches the file as it existed in the parent commit and applies it as a
//! synthetic addition or deletion.

use crate::classify;
use crate::error::Result;
use crate::git::BlobInspector;
use crate::model::FileChange;
use globset::{Glob, GlobSet, GlobSetBuilder};
use rayon::prelude::*;

pub struct ExclusionMatcher {
    set: GlobSet,
    empty: bool,
}

impl ExclusionMatcher {
    pub fn new(patterns: &[String]) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            builder.add(Glob::new(pattern)?);
        }
        Ok(Self {
            set: builder.build()?,
            empty: patterns.is_empty(),
        })
    }

    pub fn is_excluded(&self, path: &str) -> bool {
        !self.empty && self.set.is_match(path)
    }
}

/// Decompose a rename path into `(old, new)`. Two textual forms occur:
/// `"old => new"` and the compact `"prefix{old => new}suffix"`, where either
/// side of the arrow may be empty.
pub fn parse_rename(path: &str) -> Option<(String, String)> {
    if let (Some(open), Some(close)) = (path.find('{'), path.rfind('}')) {
        if open < close {
            if let Some((old_mid, new_mid)) = path[open + 1..close].split_once(" => ") {
                let prefix = &path[..open];
                let suffix = &path[close + 1..];
                return Some((
                    normalize(&format!("{prefix}{old_mid}{suffix}")),
                    normalize(&format!("{prefix}{new_mid}{suffix}")),
                ));
            }
        }
        return None;
    }
    path.split_once(" => ")
        .map(|(old, new)| (old.trim().to_string(), new.trim().to_string()))
}

// An empty rename side leaves a doubled or leading slash behind.
fn normalize(path: &str) -> String {
    path.replace("//", "/").trim_start_matches('/').to_string()
}

/// Apply exclusion globs to one commit's parsed changes.
///
/// Non-renames are kept or dropped whole. Renames are decomposed and judged
/// on both sides; a boundary crossing replaces or augments the reported edit
/// delta with the file's full parent-commit size (real line count and byte
/// size, not an estimate). The caller recomputes commit totals from the
/// returned list, so dropped entries vanish from every aggregate.
pub fn resolve_exclusions<B>(
    changes: Vec<FileChange>,
    matcher: &ExclusionMatcher,
    blobs: &B,
    parent: Option<&str>,
) -> Result<Vec<FileChange>>
where
    B: BlobInspector + Sync + ?Sized,
{
    let mut kept: Vec<FileChange> = Vec::with_capacity(changes.len());
    // (change, old path, new path, entering the measured tree)
    let mut crossings: Vec<(FileChange, String, String, bool)> = Vec::new();

    for mut change in changes {
        match parse_rename(&change.path) {
            None => {
                if !matcher.is_excluded(&change.path) {
                    kept.push(change);
                }
            }
            Some((old, new)) => {
                let old_excluded = matcher.is_excluded(&old);
                let new_excluded = matcher.is_excluded(&new);
                match (old_excluded, new_excluded) {
                    (true, true) => {}
                    (false, false) => {
                        change.path = new;
                        kept.push(change);
                    }
                    (false, true) => crossings.push((change, old, new, false)),
                    (true, false) => crossings.push((change, old, new, true)),
                }
            }
        }
    }

    if crossings.is_empty() {
        return Ok(kept);
    }
    let Some(parent) = parent else {
        // A root commit has no parent state to rename out of.
        return Ok(kept);
    };

    // Independent read-only blob lookups; fetched concurrently and folded
    // back into the single ordered list.
    let corrections = crossings
        .into_par_iter()
        .map(|(change, old, new, entering)| {
            correct_crossing(change, &old, &new, entering, parent, blobs)
        })
        .collect::<Result<Vec<_>>>()?;
    kept.extend(corrections);
    Ok(kept)
}

fn correct_crossing<B>(
    change: FileChange,
    old: &str,
    new: &str,
    entering: bool,
    parent: &str,
    blobs: &B,
) -> Result<FileChange>
where
    B: BlobInspector + ?Sized,
{
    let binary = classify::file_type(old) == classify::BINARY_TYPE;
    let prior_bytes = blobs.byte_size(parent, old)?;
    let prior_lines = if binary {
        0
    } else {
        blobs.line_count(parent, old)?
    };

    if entering {
        // Moving out of exclusion: the reported edit stands, and the file's
        // whole prior size enters the view on top of it.
        Ok(FileChange {
            path: new.to_string(),
            lines_added: change.lines_added + prior_lines,
            lines_deleted: change.lines_deleted,
            file_type: classify::file_type(new).to_string(),
            bytes_added: change.bytes_added + prior_bytes,
            bytes_deleted: change.bytes_deleted,
        })
    } else {
        // Moving into exclusion: the reported edit is no longer visible; the
        // whole prior size leaves the view instead.
        Ok(FileChange {
            path: old.to_string(),
            lines_added: 0,
            lines_deleted: prior_lines,
            file_type: classify::file_type(old).to_string(),
            bytes_added: 0,
            bytes_deleted: prior_bytes,
        })
    }
}
