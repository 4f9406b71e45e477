pub mod repo;

pub use repo::GitRepo;

use crate::error::Result;

/// One commit as delivered by the underlying log source, before parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCommit {
    pub sha: String,
    pub author_name: String,
    pub author_email: String,
    /// Unix seconds.
    pub timestamp: i64,
    pub message: String,
    /// First parent, absent for a root commit.
    pub parent_sha: Option<String>,
    /// Numstat section for the commit. `None` means the source never
    /// produced a diff summary, which downstream treats as a contract
    /// violation; an empty string is a legitimate empty commit.
    pub numstat: Option<String>,
}

/// Ordered, oldest-to-newest access to a repository's change history.
pub trait HistorySource {
    /// Stable identifier derived from repository identity, not its history.
    fn fingerprint(&self) -> Result<String>;
    /// Full history, or the newest `max` commits when bounded; always ordered
    /// oldest to newest.
    fn log(&self, max: Option<usize>) -> Result<Vec<RawCommit>>;
    /// Commits strictly newer than `sha`, oldest to newest.
    fn log_since(&self, sha: &str) -> Result<Vec<RawCommit>>;
}

/// Point-in-time file state at an arbitrary historical commit.
///
/// This is the seam for test doubles: production reads through the git
/// binary, tests substitute an in-memory fixture.
pub trait BlobInspector {
    fn line_count(&self, commit: &str, path: &str) -> Result<u64>;
    fn byte_size(&self, commit: &str, path: &str) -> Result<u64>;
}
