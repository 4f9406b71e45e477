use super::{BlobInspector, HistorySource, RawCommit};
use crate::error::{GitPulseError, Result};
use log::debug;
use std::path::{Path, PathBuf};
use std::process::Command;

// Header records start with an unprintable marker so subjects containing
// tabs stay parseable.
const HEADER_MARK: char = '\u{1}';
const LOG_FORMAT: &str = "format:%x01%H%x09%an%x09%ae%x09%at%x09%P%x09%s";

/// A discovered repository, read through the git binary as a black-box
/// line-oriented log/diff source.
pub struct GitRepo {
    path: PathBuf,
}

impl GitRepo {
    /// Open a repository at `path`, or current dir if `None`
    pub fn open<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        let repo_path = path
            .map(|p| p.as_ref().to_path_buf())
            .unwrap_or(std::env::current_dir()?);

        let repo = gix::discover(&repo_path)?;
        let path = repo.workdir().unwrap_or_else(|| repo.path()).to_path_buf();

        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn git(&self, args: &[&str]) -> Result<String> {
        debug!("git {}", args.join(" "));
        let output = Command::new("git")
            .arg("-C")
            .arg(&self.path)
            .args(args)
            .output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GitPulseError::Git(format!(
                "git {} failed: {}",
                args.first().copied().unwrap_or(""),
                stderr.trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn log_with(&self, extra: &[String]) -> Result<Vec<RawCommit>> {
        let mut args: Vec<String> = vec![
            "log".into(),
            "--reverse".into(),
            "-M".into(),
            "--numstat".into(),
            format!("--pretty={LOG_FORMAT}"),
        ];
        args.extend_from_slice(extra);
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let stdout = self.git(&arg_refs)?;
        parse_log(&stdout)
    }
}

impl HistorySource for GitRepo {
    fn fingerprint(&self) -> Result<String> {
        // Repository identity is its root commit(s); those never change as
        // history grows, unlike HEAD.
        let roots = self.git(&["rev-list", "--max-parents=0", "HEAD"])?;
        let mut shas: Vec<&str> = roots.split_whitespace().collect();
        if shas.is_empty() {
            return Err(GitPulseError::Git("repository has no commits".into()));
        }
        shas.sort_unstable();
        Ok(shas.join("+"))
    }

    fn log(&self, max: Option<usize>) -> Result<Vec<RawCommit>> {
        match max {
            // git applies commit limiting before --reverse, so this yields
            // the newest `n` commits in oldest-first order.
            Some(n) => self.log_with(&[format!("-n{n}")]),
            None => self.log_with(&[]),
        }
    }

    fn log_since(&self, sha: &str) -> Result<Vec<RawCommit>> {
        self.log_with(&[format!("{sha}..HEAD")])
    }
}

impl BlobInspector for GitRepo {
    fn line_count(&self, commit: &str, path: &str) -> Result<u64> {
        let spec = format!("{commit}:{path}");
        let content = self.git(&["show", &spec])?;
        Ok(content.lines().count() as u64)
    }

    fn byte_size(&self, commit: &str, path: &str) -> Result<u64> {
        let spec = format!("{commit}:{path}");
        let output = self.git(&["cat-file", "-s", &spec])?;
        output.trim().parse::<u64>().map_err(|_| {
            GitPulseError::Parse(format!("unexpected cat-file output {output:?} for {spec}"))
        })
    }
}

fn parse_log(output: &str) -> Result<Vec<RawCommit>> {
    let mut commits: Vec<RawCommit> = Vec::new();
    for line in output.lines() {
        if let Some(header) = line.strip_prefix(HEADER_MARK) {
            let mut fields = header.splitn(6, '\t');
            let (Some(sha), Some(name), Some(email), Some(ts), Some(parents)) = (
                fields.next(),
                fields.next(),
                fields.next(),
                fields.next(),
                fields.next(),
            ) else {
                return Err(GitPulseError::Parse(format!(
                    "malformed log header: {header:?}"
                )));
            };
            let timestamp = ts.parse::<i64>().map_err(|_| {
                GitPulseError::Parse(format!("bad commit timestamp {ts:?} for {sha}"))
            })?;
            commits.push(RawCommit {
                sha: sha.to_string(),
                author_name: name.to_string(),
                author_email: email.to_string(),
                timestamp,
                message: fields.next().unwrap_or("").to_string(),
                parent_sha: parents.split_whitespace().next().map(str::to_string),
                numstat: Some(String::new()),
            });
        } else if !line.is_empty() {
            if let Some(current) = commits.last_mut() {
                if let Some(numstat) = current.numstat.as_mut() {
                    numstat.push_str(line);
                    numstat.push('\n');
                }
            }
        }
    }
    Ok(commits)
}
