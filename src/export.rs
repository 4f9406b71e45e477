use crate::cli::CommonArgs;
use crate::git::GitRepo;
use crate::model::{CommitRecord, ExportOutput, SCHEMA_VERSION};
use crate::walker;
use anyhow::Context;
use chrono::Utc;
use std::collections::HashSet;

pub fn exec(common: CommonArgs, json: bool, ndjson: bool) -> anyhow::Result<()> {
    let repo = GitRepo::open(common.repo.as_ref()).context("Failed to open git repository")?;
    let config = common.effective_config(repo.path())?;
    let records = walker::scan_repo(&repo, &config, &common.scan_options(&config))
        .context("Failed to collect commit history")?;

    if json {
        output_json(&records, &repo, &config)?;
    } else if ndjson {
        output_ndjson(&records)?;
    } else {
        output_summary(&records)?;
    }

    Ok(())
}

fn output_json(
    records: &[CommitRecord],
    repo: &GitRepo,
    config: &crate::config::Config,
) -> anyhow::Result<()> {
    let output = ExportOutput {
        version: SCHEMA_VERSION.to_string(),
        generated_at: Utc::now(),
        repository_path: repo.path().to_string_lossy().to_string(),
        exclude: config.exclude.clone(),
        max_commits: config.max_commits,
        entries: records.to_vec(),
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn output_ndjson(records: &[CommitRecord]) -> anyhow::Result<()> {
    for record in records {
        println!("{}", serde_json::to_string(record)?);
    }
    Ok(())
}

fn output_summary(records: &[CommitRecord]) -> anyhow::Result<()> {
    use console::style;

    println!("{}", style("Export Summary").bold());
    println!("{}", "─".repeat(50));

    let total_commits = records.len();
    let total_files: usize = records.iter().map(|r| r.files.len()).sum();
    let total_added: u64 = records.iter().map(|r| r.lines_added).sum();
    let total_deleted: u64 = records.iter().map(|r| r.lines_deleted).sum();
    let total_bytes_added: u64 = records.iter().map(|r| r.bytes_added).sum();

    let unique_authors: HashSet<_> = records.iter().map(|r| &r.author_name).collect();

    println!("Total commits: {}", style(total_commits).cyan());
    println!("Total files changed: {}", style(total_files).cyan());
    println!("Total lines added: {}", style(total_added).green());
    println!("Total lines deleted: {}", style(total_deleted).red());
    println!(
        "Estimated bytes added: {}",
        style(total_bytes_added).green()
    );
    println!("Unique authors: {}", style(unique_authors.len()).yellow());

    if !records.is_empty() {
        let first = &records[0];
        let last = &records[records.len() - 1];
        println!(
            "Date range: {} to {}",
            style(first.timestamp.format("%Y-%m-%d")).dim(),
            style(last.timestamp.format("%Y-%m-%d")).dim()
        );
    }

    println!("\nUse --json or --ndjson flags to export the raw data.");
    Ok(())
}
