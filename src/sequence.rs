use crate::cli::CommonArgs;
use crate::git::GitRepo;
use crate::model::{CommitRecord, SequenceOutput, SequencePoint, SCHEMA_VERSION};
use crate::util::short_sha;
use crate::walker;
use anyhow::Context;
use chrono::Utc;
use console::style;

/// Sha carried by the synthetic index-0 baseline point.
pub const BASELINE_SHA: &str = "start";

/// Starting cumulative state, for analyzing a tail window that is known to
/// follow some earlier, unseen, history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SequenceBaseline {
    pub lines: i64,
    pub bytes: i64,
}

pub fn exec(common: CommonArgs, json: bool, ndjson: bool) -> anyhow::Result<()> {
    let repo = GitRepo::open(common.repo.as_ref()).context("Failed to open git repository")?;
    let config = common.effective_config(repo.path())?;
    let records = walker::scan_repo(&repo, &config, &common.scan_options(&config))
        .context("Failed to collect commit history")?;

    let points = aggregate_sequence(&records, SequenceBaseline::default());

    if json {
        let output = SequenceOutput {
            version: SCHEMA_VERSION.to_string(),
            generated_at: Utc::now(),
            repository_path: repo.path().to_string_lossy().to_string(),
            exclude: config.exclude.clone(),
            max_commits: config.max_commits,
            points,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else if ndjson {
        for point in &points {
            println!("{}", serde_json::to_string(point)?);
        }
    } else {
        output_table(&points)?;
    }

    Ok(())
}

/// Fold ordered commits into per-commit-index running totals.
///
/// Index 0 is always a synthetic baseline point carrying the seed state;
/// real commits follow at 1..=n. No clamping happens here: this view exists
/// for exact window-composition arithmetic, not display safety, so a seeded
/// suffix reproduces the full run's final state bit for bit.
pub fn aggregate_sequence(
    commits: &[CommitRecord],
    baseline: SequenceBaseline,
) -> Vec<SequencePoint> {
    let mut points = Vec::with_capacity(commits.len() + 1);
    let baseline_ts = commits
        .first()
        .map(|c| c.timestamp)
        .unwrap_or_else(Utc::now);
    points.push(SequencePoint {
        index: 0,
        sha: BASELINE_SHA.to_string(),
        timestamp: baseline_ts,
        cumulative_lines: baseline.lines,
        cumulative_bytes: baseline.bytes,
        commit_count: 0,
        lines_added: 0,
        lines_deleted: 0,
        net_lines: 0,
    });

    let mut cumulative_lines = baseline.lines;
    let mut cumulative_bytes = baseline.bytes;
    for (i, commit) in commits.iter().enumerate() {
        let net_lines = commit.net_lines();
        cumulative_lines += net_lines;
        cumulative_bytes += commit.bytes_added as i64 - commit.bytes_deleted as i64;
        points.push(SequencePoint {
            index: i + 1,
            sha: commit.sha.clone(),
            timestamp: commit.timestamp,
            cumulative_lines,
            cumulative_bytes,
            commit_count: 1,
            lines_added: commit.lines_added,
            lines_deleted: commit.lines_deleted,
            net_lines,
        });
    }
    points
}

/// The seed to carry into a window that continues this one.
pub fn final_state(points: &[SequencePoint]) -> SequenceBaseline {
    points
        .last()
        .map(|p| SequenceBaseline {
            lines: p.cumulative_lines,
            bytes: p.cumulative_bytes,
        })
        .unwrap_or_default()
}

fn output_table(points: &[SequencePoint]) -> anyhow::Result<()> {
    println!(
        "{:>6} {:<10} {:>8} {:>8} {:>8} {:>12} {:>14}",
        style("Index").bold(),
        style("Sha").bold(),
        style("+Lines").bold(),
        style("-Lines").bold(),
        style("Net").bold(),
        style("Cum Lines").bold(),
        style("Cum Bytes").bold()
    );
    println!("{}", "─".repeat(72));
    for point in points {
        println!(
            "{:>6} {:<10} {:>8} {:>8} {:>8} {:>12} {:>14}",
            point.index,
            short_sha(&point.sha),
            point.lines_added,
            point.lines_deleted,
            point.net_lines,
            point.cumulative_lines,
            point.cumulative_bytes
        );
    }
    Ok(())
}
