use crate::classify;
use crate::cli::CommonArgs;
use crate::config::Config;
use crate::git::GitRepo;
use crate::model::{CategoryBreakdown, CommitRecord, TimeBucketPoint, TimelineOutput, SCHEMA_VERSION};
use crate::util::{bucket_key, bucket_width};
use crate::walker;
use anyhow::Context;
use chrono::Utc;
use console::style;
use std::collections::HashMap;

pub fn exec(common: CommonArgs, json: bool, ndjson: bool) -> anyhow::Result<()> {
    let repo = GitRepo::open(common.repo.as_ref()).context("Failed to open git repository")?;
    let config = common.effective_config(repo.path())?;
    let records = walker::scan_repo(&repo, &config, &common.scan_options(&config))
        .context("Failed to collect commit history")?;

    let points = aggregate_timeline(&records, &config);

    if json {
        output_json(&points, &repo, &config)?;
    } else if ndjson {
        output_ndjson(&points)?;
    } else {
        output_table(&points)?;
    }

    Ok(())
}

/// Fold ordered commits into wall-clock buckets.
///
/// Buckets are hour-wide when the whole history spans less than
/// `hourly_threshold_hours`, day-wide otherwise. The first point is a
/// synthetic all-zero baseline one bucket-width before the first commit.
/// Cumulative counters are clamped at zero after every commit, so partial
/// histories whose deletions outweigh the additions in view never chart
/// below the axis.
pub fn aggregate_timeline(commits: &[CommitRecord], config: &Config) -> Vec<TimeBucketPoint> {
    let (Some(first), Some(last)) = (commits.first(), commits.last()) else {
        return Vec::new();
    };
    let age_hours = (last.timestamp - first.timestamp).num_hours();
    let hourly = age_hours < config.hourly_threshold_hours;
    let width = bucket_width(hourly);

    let mut buckets: HashMap<String, TimeBucketPoint> = HashMap::new();
    let baseline = bucket_key(&(first.timestamp - width), hourly);
    buckets.insert(baseline.clone(), TimeBucketPoint::empty(baseline));

    let mut cumulative_lines = CategoryBreakdown::default();
    let mut cumulative_bytes = CategoryBreakdown::default();

    for commit in commits {
        let key = bucket_key(&commit.timestamp, hourly);
        let point = buckets
            .entry(key.clone())
            .or_insert_with(|| TimeBucketPoint::empty(key));
        point.commit_count += 1;
        point.shas.push(commit.sha.clone());

        for file in &commit.files {
            let category = classify::category_for(&file.path, &file.file_type, &config.categories);
            if file.file_type != classify::BINARY_TYPE {
                point.lines_added.add(category, file.lines_added as i64);
                point.lines_deleted.add(category, file.lines_deleted as i64);
                cumulative_lines.add(
                    category,
                    file.lines_added as i64 - file.lines_deleted as i64,
                );
            }
            point.bytes_added.add(category, file.bytes_added as i64);
            point.bytes_deleted.add(category, file.bytes_deleted as i64);
            cumulative_bytes.add(
                category,
                file.bytes_added as i64 - file.bytes_deleted as i64,
            );
        }

        cumulative_lines.clamp_non_negative();
        cumulative_bytes.clamp_non_negative();
        point.cumulative_lines = cumulative_lines.clone();
        point.cumulative_bytes = cumulative_bytes.clone();
    }

    let mut points: Vec<TimeBucketPoint> = buckets.into_values().collect();
    points.sort_by(|a, b| a.bucket.cmp(&b.bucket));
    points
}

fn output_json(points: &[TimeBucketPoint], repo: &GitRepo, config: &Config) -> anyhow::Result<()> {
    let output = TimelineOutput {
        version: SCHEMA_VERSION.to_string(),
        generated_at: Utc::now(),
        repository_path: repo.path().to_string_lossy().to_string(),
        exclude: config.exclude.clone(),
        max_commits: config.max_commits,
        points: points.to_vec(),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn output_ndjson(points: &[TimeBucketPoint]) -> anyhow::Result<()> {
    for point in points {
        println!("{}", serde_json::to_string(point)?);
    }
    Ok(())
}

fn output_table(points: &[TimeBucketPoint]) -> anyhow::Result<()> {
    println!(
        "{:<16} {:>8} {:>10} {:>10} {:>12} {:>14}",
        style("Bucket").bold(),
        style("Commits").bold(),
        style("+Lines").bold(),
        style("-Lines").bold(),
        style("Cum Lines").bold(),
        style("Cum Bytes").bold()
    );
    println!("{}", "─".repeat(76));
    for point in points {
        println!(
            "{:<16} {:>8} {:>10} {:>10} {:>12} {:>14}",
            point.bucket,
            point.commit_count,
            point.lines_added.total,
            point.lines_deleted.total,
            point.cumulative_lines.total,
            point.cumulative_bytes.total
        );
    }
    Ok(())
}
