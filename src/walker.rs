//! Drives the per-commit pipeline in history order and reuses cached
//! records across runs.

use crate::cache::Cache;
use crate::config::Config;
use crate::diffstat;
use crate::error::{GitPulseError, Result};
use crate::exclude::{self, ExclusionMatcher};
use crate::git::{BlobInspector, GitRepo, HistorySource, RawCommit};
use crate::model::CommitRecord;
use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, warn};
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    pub max_commits: Option<usize>,
    pub clear_cache: bool,
}

/// Collect the full (or bounded) commit history as resolved records.
///
/// Cache reads and writes only happen for unbounded scans: a "last N
/// commits" window is not a prefix of the full history, so it must neither
/// be fed from nor allowed to poison a full-history entry. Cancellation is
/// honored between commits, never mid-commit, and a cancelled run skips the
/// cache write.
pub fn collect_history<S>(
    source: &S,
    mut cache: Option<&mut Cache>,
    config: &Config,
    options: &ScanOptions,
    cancel: &AtomicBool,
) -> Result<Vec<CommitRecord>>
where
    S: HistorySource + BlobInspector + Sync,
{
    let matcher = ExclusionMatcher::new(&config.exclude)?;
    let fingerprint = source.fingerprint()?;

    if options.clear_cache {
        if let Some(cache) = cache.as_deref_mut() {
            if let Err(e) = cache.clear(&fingerprint) {
                warn!("failed to clear cache entry: {e}");
            }
        }
    }

    let bounded = options.max_commits.is_some();
    let mut records: Vec<CommitRecord> = Vec::new();
    let raw_commits: Vec<RawCommit>;

    if bounded {
        raw_commits = source.log(options.max_commits)?;
    } else {
        let cached = match cache.as_deref_mut() {
            Some(cache) => match cache.load(&fingerprint, &config.cache_version) {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("cache read failed, recomputing from scratch: {e}");
                    None
                }
            },
            None => None,
        };
        match cached {
            Some(entry) => {
                debug!(
                    "cache hit for {fingerprint}: {} commits through {}",
                    entry.commits.len(),
                    entry.last_sha
                );
                match source.log_since(&entry.last_sha) {
                    Ok(mut newer) => {
                        // The boundary commit is already represented in the
                        // cached list.
                        newer.retain(|raw| raw.sha != entry.last_sha);
                        records = entry.commits;
                        raw_commits = newer;
                    }
                    Err(e) => {
                        warn!(
                            "cached tip {} is unusable ({e}); recomputing from scratch",
                            entry.last_sha
                        );
                        raw_commits = source.log(None)?;
                    }
                }
            }
            None => {
                raw_commits = source.log(None)?;
            }
        }
    }

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message("Processing commits...");

    let mut cancelled = false;
    for raw in raw_commits {
        if cancel.load(Ordering::Relaxed) {
            debug!("scan cancelled after {} commits", records.len());
            cancelled = true;
            break;
        }
        let record = match process_commit(&raw, &matcher, source, config) {
            Ok(record) => record,
            Err(e @ GitPulseError::Contract(_)) => {
                pb.finish_and_clear();
                return Err(e);
            }
            Err(e) => {
                warn!("commit {}: {e}; substituting zero-delta record", raw.sha);
                zero_delta(&raw)?
            }
        };
        records.push(record);
        pb.inc(1);
    }
    pb.finish_and_clear();

    if !bounded && !cancelled {
        if let Some(cache) = cache.as_deref_mut() {
            if let Err(e) = cache.save(&fingerprint, &config.cache_version, &records) {
                warn!("cache write failed, continuing without persistence: {e}");
            }
        }
    }

    Ok(records)
}

/// CLI-facing wrapper: wires the cache in when enabled and degrades to a
/// plain scan when it cannot be opened.
pub fn scan_repo(repo: &GitRepo, config: &Config, options: &ScanOptions) -> Result<Vec<CommitRecord>> {
    let cancel = AtomicBool::new(false);
    if config.cache_enabled {
        match Cache::open(config.cache_path(repo.path())) {
            Ok(mut cache) => {
                return collect_history(repo, Some(&mut cache), config, options, &cancel)
            }
            Err(e) => warn!("cache unavailable, recomputing from scratch: {e}"),
        }
    }
    collect_history(repo, None, config, options, &cancel)
}

fn process_commit<S>(
    raw: &RawCommit,
    matcher: &ExclusionMatcher,
    source: &S,
    config: &Config,
) -> Result<CommitRecord>
where
    S: BlobInspector + Sync,
{
    let diff = diffstat::build_parsed_diff(&raw.sha, raw.numstat.as_deref(), config.bytes_per_line)?;
    let files = exclude::resolve_exclusions(diff.files, matcher, source, raw.parent_sha.as_deref())?;
    Ok(CommitRecord::new(
        raw.sha.clone(),
        raw.author_name.clone(),
        raw.author_email.clone(),
        commit_time(raw)?,
        raw.message.clone(),
        files,
    ))
}

fn zero_delta(raw: &RawCommit) -> Result<CommitRecord> {
    Ok(CommitRecord::new(
        raw.sha.clone(),
        raw.author_name.clone(),
        raw.author_email.clone(),
        commit_time(raw)?,
        raw.message.clone(),
        Vec::new(),
    ))
}

fn commit_time(raw: &RawCommit) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(raw.timestamp, 0).ok_or_else(|| {
        GitPulseError::Parse(format!(
            "invalid timestamp {} for commit {}",
            raw.timestamp, raw.sha
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SCHEMA_VERSION;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    /// In-memory stand-in for the git data source.
    struct FixtureSource {
        commits: Mutex<Vec<RawCommit>>,
        fingerprint: String,
    }

    impl FixtureSource {
        fn new(commits: Vec<RawCommit>) -> Self {
            Self {
                commits: Mutex::new(commits),
                fingerprint: "fixture-root".to_string(),
            }
        }

        fn push(&self, commit: RawCommit) {
            self.commits.lock().unwrap().push(commit);
        }
    }

    impl HistorySource for FixtureSource {
        fn fingerprint(&self) -> crate::error::Result<String> {
            Ok(self.fingerprint.clone())
        }

        fn log(&self, max: Option<usize>) -> crate::error::Result<Vec<RawCommit>> {
            let commits = self.commits.lock().unwrap();
            match max {
                Some(n) => {
                    let skip = commits.len().saturating_sub(n);
                    Ok(commits[skip..].to_vec())
                }
                None => Ok(commits.clone()),
            }
        }

        fn log_since(&self, sha: &str) -> crate::error::Result<Vec<RawCommit>> {
            let commits = self.commits.lock().unwrap();
            match commits.iter().position(|c| c.sha == sha) {
                Some(pos) => Ok(commits[pos + 1..].to_vec()),
                None => Err(GitPulseError::Git(format!("unknown revision {sha}"))),
            }
        }
    }

    impl BlobInspector for FixtureSource {
        fn line_count(&self, commit: &str, path: &str) -> crate::error::Result<u64> {
            Err(GitPulseError::Git(format!("no blob {commit}:{path}")))
        }

        fn byte_size(&self, commit: &str, path: &str) -> crate::error::Result<u64> {
            Err(GitPulseError::Git(format!("no blob {commit}:{path}")))
        }
    }

    fn raw(sha: &str, ts: i64, parent: Option<&str>, numstat: Option<&str>) -> RawCommit {
        RawCommit {
            sha: sha.to_string(),
            author_name: "Ada".to_string(),
            author_email: "ada@example.com".to_string(),
            timestamp: ts,
            message: format!("commit {sha}"),
            parent_sha: parent.map(str::to_string),
            numstat: numstat.map(str::to_string),
        }
    }

    fn three_commits() -> Vec<RawCommit> {
        vec![
            raw("aaa", 1_700_000_000, None, Some("10\t0\tsrc/a.ts\n")),
            raw("bbb", 1_700_003_600, Some("aaa"), Some("20\t5\tsrc/b.ts\n")),
            raw("ccc", 1_700_007_200, Some("bbb"), Some("3\t1\tREADME.md\n")),
        ]
    }

    fn test_cache() -> (tempfile::TempDir, Cache) {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::open(dir.path().join(".gitpulse")).unwrap();
        (dir, cache)
    }

    fn never() -> AtomicBool {
        AtomicBool::new(false)
    }

    #[test]
    fn full_scan_produces_ordered_records_and_populates_cache() {
        let source = FixtureSource::new(three_commits());
        let (_dir, mut cache) = test_cache();
        let config = Config::default();

        let records = collect_history(
            &source,
            Some(&mut cache),
            &config,
            &ScanOptions::default(),
            &never(),
        )
        .unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].sha, "aaa");
        assert_eq!(records[2].sha, "ccc");
        assert_eq!(records[1].lines_added, 20);

        let entry = cache.load("fixture-root", SCHEMA_VERSION).unwrap().unwrap();
        assert_eq!(entry.last_sha, "ccc");
        assert_eq!(entry.commits, records);
    }

    #[test]
    fn second_run_appends_only_newer_commits() {
        let source = FixtureSource::new(three_commits());
        let (_dir, mut cache) = test_cache();
        let config = Config::default();

        let first = collect_history(
            &source,
            Some(&mut cache),
            &config,
            &ScanOptions::default(),
            &never(),
        )
        .unwrap();
        assert_eq!(first.len(), 3);

        source.push(raw("ddd", 1_700_010_800, Some("ccc"), Some("7\t0\tsrc/d.ts\n")));
        source.push(raw("eee", 1_700_014_400, Some("ddd"), Some("1\t1\tsrc/e.ts\n")));

        let second = collect_history(
            &source,
            Some(&mut cache),
            &config,
            &ScanOptions::default(),
            &never(),
        )
        .unwrap();
        assert_eq!(second.len(), 5);
        assert_eq!(second[..3], first[..]);
        assert_eq!(second[4].sha, "eee");

        let entry = cache.load("fixture-root", SCHEMA_VERSION).unwrap().unwrap();
        assert_eq!(entry.commits.len(), 5);
        assert_eq!(entry.last_sha, "eee");
    }

    #[test]
    fn inclusive_boundary_duplicate_is_dropped() {
        // A source whose "strictly newer" fetch leaks the boundary commit
        // itself must not double-count it.
        struct Inclusive(FixtureSource);
        impl HistorySource for Inclusive {
            fn fingerprint(&self) -> crate::error::Result<String> {
                self.0.fingerprint()
            }
            fn log(&self, max: Option<usize>) -> crate::error::Result<Vec<RawCommit>> {
                self.0.log(max)
            }
            fn log_since(&self, sha: &str) -> crate::error::Result<Vec<RawCommit>> {
                let commits = self.0.commits.lock().unwrap();
                let pos = commits.iter().position(|c| c.sha == sha).unwrap_or(0);
                Ok(commits[pos..].to_vec())
            }
        }
        impl BlobInspector for Inclusive {
            fn line_count(&self, commit: &str, path: &str) -> crate::error::Result<u64> {
                self.0.line_count(commit, path)
            }
            fn byte_size(&self, commit: &str, path: &str) -> crate::error::Result<u64> {
                self.0.byte_size(commit, path)
            }
        }

        let source = Inclusive(FixtureSource::new(three_commits()));
        let (_dir, mut cache) = test_cache();
        let config = Config::default();

        collect_history(
            &source,
            Some(&mut cache),
            &config,
            &ScanOptions::default(),
            &never(),
        )
        .unwrap();
        let second = collect_history(
            &source,
            Some(&mut cache),
            &config,
            &ScanOptions::default(),
            &never(),
        )
        .unwrap();
        assert_eq!(second.len(), 3);
    }

    #[test]
    fn bounded_request_bypasses_cache_for_read_and_write() {
        let source = FixtureSource::new(three_commits());
        let (_dir, mut cache) = test_cache();
        let config = Config::default();

        let bounded = ScanOptions {
            max_commits: Some(2),
            clear_cache: false,
        };
        let records = collect_history(&source, Some(&mut cache), &config, &bounded, &never()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].sha, "bbb");
        assert_eq!(records[1].sha, "ccc");
        // Nothing was persisted for the bounded window.
        assert!(cache.load("fixture-root", SCHEMA_VERSION).unwrap().is_none());

        // And a populated entry is not read back by a bounded request.
        collect_history(
            &source,
            Some(&mut cache),
            &config,
            &ScanOptions::default(),
            &never(),
        )
        .unwrap();
        let narrow =
            collect_history(&source, Some(&mut cache), &config, &bounded, &never()).unwrap();
        assert_eq!(narrow.len(), 2);
        assert_eq!(narrow[0].sha, "bbb");
    }

    #[test]
    fn wider_request_after_bounded_run_returns_full_history() {
        let source = FixtureSource::new(three_commits());
        let (_dir, mut cache) = test_cache();
        let config = Config::default();

        let bounded = ScanOptions {
            max_commits: Some(2),
            clear_cache: false,
        };
        let narrow =
            collect_history(&source, Some(&mut cache), &config, &bounded, &never()).unwrap();
        let full = collect_history(
            &source,
            Some(&mut cache),
            &config,
            &ScanOptions::default(),
            &never(),
        )
        .unwrap();
        assert_eq!(narrow.len(), 2);
        assert_eq!(full.len(), 3);
        assert_ne!(narrow, full);
    }

    #[test]
    fn clear_cache_flag_discards_entry_before_scanning() {
        let source = FixtureSource::new(three_commits());
        let (_dir, mut cache) = test_cache();
        let config = Config::default();

        collect_history(
            &source,
            Some(&mut cache),
            &config,
            &ScanOptions::default(),
            &never(),
        )
        .unwrap();

        // Poison the entry with a bogus record; clear_cache must drop it.
        let bogus = vec![CommitRecord::new(
            "zzz".into(),
            "Eve".into(),
            "eve@example.com".into(),
            Utc::now(),
            "bogus".into(),
            Vec::new(),
        )];
        cache.save("fixture-root", SCHEMA_VERSION, &bogus).unwrap();

        let options = ScanOptions {
            max_commits: None,
            clear_cache: true,
        };
        let records =
            collect_history(&source, Some(&mut cache), &config, &options, &never()).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].sha, "aaa");
    }

    #[test]
    fn unusable_cached_tip_recomputes_from_scratch() {
        let source = FixtureSource::new(three_commits());
        let (_dir, mut cache) = test_cache();
        let config = Config::default();

        // Simulate a rewritten history: the cached tip no longer exists.
        let stale = vec![CommitRecord::new(
            "gone".into(),
            "Ada".into(),
            "ada@example.com".into(),
            Utc::now(),
            "stale".into(),
            Vec::new(),
        )];
        cache.save("fixture-root", SCHEMA_VERSION, &stale).unwrap();

        let records = collect_history(
            &source,
            Some(&mut cache),
            &config,
            &ScanOptions::default(),
            &never(),
        )
        .unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].sha, "aaa");
    }

    #[test]
    fn transient_failure_substitutes_zero_delta_record() {
        // A rename crossing the exclusion boundary needs blob lookups, and
        // the fixture's always fail; the commit must degrade to zero-delta
        // instead of killing the scan.
        let mut commits = three_commits();
        commits.push(raw(
            "ddd",
            1_700_010_800,
            Some("ccc"),
            Some("5\t3\tsrc/big.ts => attic/big.ts\n"),
        ));
        let source = FixtureSource::new(commits);
        let config = Config {
            exclude: vec!["attic/**".to_string()],
            ..Config::default()
        };

        let records =
            collect_history(&source, None, &config, &ScanOptions::default(), &never()).unwrap();
        assert_eq!(records.len(), 4);
        let substituted = &records[3];
        assert_eq!(substituted.sha, "ddd");
        assert_eq!(substituted.lines_added, 0);
        assert_eq!(substituted.lines_deleted, 0);
        assert!(substituted.files.is_empty());
    }

    #[test]
    fn missing_stat_section_aborts_the_run() {
        let commits = vec![raw("aaa", 1_700_000_000, None, None)];
        let source = FixtureSource::new(commits);
        let config = Config::default();

        let err = collect_history(&source, None, &config, &ScanOptions::default(), &never())
            .unwrap_err();
        assert!(matches!(err, GitPulseError::Contract(_)));
    }

    #[test]
    fn cancellation_stops_between_commits_and_skips_persistence() {
        let source = FixtureSource::new(three_commits());
        let (_dir, mut cache) = test_cache();
        let config = Config::default();

        let cancelled = AtomicBool::new(true);
        let records = collect_history(
            &source,
            Some(&mut cache),
            &config,
            &ScanOptions::default(),
            &cancelled,
        )
        .unwrap();
        assert!(records.is_empty());
        assert!(cache.load("fixture-root", SCHEMA_VERSION).unwrap().is_none());
    }

    #[test]
    fn exclusions_flow_through_the_pipeline() {
        let commits = vec![raw(
            "aaa",
            1_700_000_000,
            None,
            Some("10\t0\tsrc/a.ts\n4\t0\tvendor/dep.ts\n"),
        )];
        let source = FixtureSource::new(commits);
        let config = Config {
            exclude: vec!["vendor/**".to_string()],
            ..Config::default()
        };

        let records =
            collect_history(&source, None, &config, &ScanOptions::default(), &never()).unwrap();
        assert_eq!(records[0].files.len(), 1);
        assert_eq!(records[0].lines_added, 10);
        assert_eq!(records[0].bytes_added, 500);
    }
}
