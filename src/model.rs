use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const SCHEMA_VERSION: &str = "2";

/// One file's delta within one commit. Byte figures are estimates unless a
/// rename-boundary correction substituted real blob sizes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileChange {
    pub path: String,
    pub lines_added: u64,
    pub lines_deleted: u64,
    pub file_type: String,
    pub bytes_added: u64,
    pub bytes_deleted: u64,
}

/// The authoritative unit of history; never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommitRecord {
    pub sha: String,
    pub author_name: String,
    pub author_email: String,
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub lines_added: u64,
    pub lines_deleted: u64,
    pub bytes_added: u64,
    pub bytes_deleted: u64,
    pub files: Vec<FileChange>,
}

impl CommitRecord {
    /// Aggregate totals are derived from the resolved file list.
    pub fn new(
        sha: String,
        author_name: String,
        author_email: String,
        timestamp: DateTime<Utc>,
        message: String,
        files: Vec<FileChange>,
    ) -> Self {
        let lines_added = files.iter().map(|f| f.lines_added).sum();
        let lines_deleted = files.iter().map(|f| f.lines_deleted).sum();
        let bytes_added = files.iter().map(|f| f.bytes_added).sum();
        let bytes_deleted = files.iter().map(|f| f.bytes_deleted).sum();
        Self {
            sha,
            author_name,
            author_email,
            timestamp,
            message,
            lines_added,
            lines_deleted,
            bytes_added,
            bytes_deleted,
            files,
        }
    }

    pub fn net_lines(&self) -> i64 {
        self.lines_added as i64 - self.lines_deleted as i64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Application,
    Test,
    Build,
    Documentation,
    Other,
}

/// Six named counters; every lines/bytes quantity in the time-bucket view is
/// one of these, never a bare scalar.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategoryBreakdown {
    pub total: i64,
    pub application: i64,
    pub test: i64,
    pub build: i64,
    pub documentation: i64,
    pub other: i64,
}

impl CategoryBreakdown {
    pub fn add(&mut self, category: Category, amount: i64) {
        self.total += amount;
        match category {
            Category::Application => self.application += amount,
            Category::Test => self.test += amount,
            Category::Build => self.build += amount,
            Category::Documentation => self.documentation += amount,
            Category::Other => self.other += amount,
        }
    }

    /// Floor each category at zero and recompute the total from the floored
    /// values, keeping `total == sum(categories)` intact.
    pub fn clamp_non_negative(&mut self) {
        self.application = self.application.max(0);
        self.test = self.test.max(0);
        self.build = self.build.max(0);
        self.documentation = self.documentation.max(0);
        self.other = self.other.max(0);
        self.total = self.category_sum();
    }

    pub fn category_sum(&self) -> i64 {
        self.application + self.test + self.build + self.documentation + self.other
    }
}

/// One wall-clock bucket (hour or day) of the time-series view.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeBucketPoint {
    pub bucket: String,
    pub commit_count: u32,
    pub shas: Vec<String>,
    pub lines_added: CategoryBreakdown,
    pub lines_deleted: CategoryBreakdown,
    pub cumulative_lines: CategoryBreakdown,
    pub bytes_added: CategoryBreakdown,
    pub bytes_deleted: CategoryBreakdown,
    pub cumulative_bytes: CategoryBreakdown,
}

impl TimeBucketPoint {
    pub fn empty(bucket: String) -> Self {
        Self {
            bucket,
            commit_count: 0,
            shas: Vec::new(),
            lines_added: CategoryBreakdown::default(),
            lines_deleted: CategoryBreakdown::default(),
            cumulative_lines: CategoryBreakdown::default(),
            bytes_added: CategoryBreakdown::default(),
            bytes_deleted: CategoryBreakdown::default(),
            cumulative_bytes: CategoryBreakdown::default(),
        }
    }
}

/// One per-commit-index entry of the sequence view. Cumulative values are
/// unclamped so contiguous windows compose exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SequencePoint {
    pub index: usize,
    pub sha: String,
    pub timestamp: DateTime<Utc>,
    pub cumulative_lines: i64,
    pub cumulative_bytes: i64,
    pub commit_count: u32,
    pub lines_added: u64,
    pub lines_deleted: u64,
    pub net_lines: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub fingerprint: String,
    pub version: String,
    pub last_sha: String,
    pub commits: Vec<CommitRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineOutput {
    pub version: String,
    pub generated_at: DateTime<Utc>,
    pub repository_path: String,
    pub exclude: Vec<String>,
    pub max_commits: Option<usize>,
    pub points: Vec<TimeBucketPoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceOutput {
    pub version: String,
    pub generated_at: DateTime<Utc>,
    pub repository_path: String,
    pub exclude: Vec<String>,
    pub max_commits: Option<usize>,
    pub points: Vec<SequencePoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportOutput {
    pub version: String,
    pub generated_at: DateTime<Utc>,
    pub repository_path: String,
    pub exclude: Vec<String>,
    pub max_commits: Option<usize>,
    pub entries: Vec<CommitRecord>,
}
