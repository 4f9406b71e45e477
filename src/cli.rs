use crate::config::Config;
use crate::walker::ScanOptions;
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "gitpulse")]
#[command(about = "Git history analytics: cached time-series and per-commit aggregates")]
#[command(version)]
pub struct Cli {
    #[clap(flatten)]
    pub common: CommonArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Clone)]
pub struct CommonArgs {
    #[arg(long, help = "Path to git repository")]
    pub repo: Option<PathBuf>,

    #[arg(long, help = "Path to a gitpulse.toml configuration file")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Glob pattern for paths to exclude (repeatable)")]
    pub exclude: Vec<String>,

    #[arg(long, help = "Only analyze the newest N commits (bypasses the cache)")]
    pub max_commits: Option<usize>,

    #[arg(long, help = "Disable the incremental cache", default_value_t = false)]
    pub no_cache: bool,

    #[arg(long, help = "Drop any cached history before scanning", default_value_t = false)]
    pub clear_cache: bool,
}

impl CommonArgs {
    /// File configuration overlaid with command-line flags.
    pub fn effective_config(&self, repo_root: &Path) -> Result<Config> {
        let mut config = Config::load(repo_root, self.config.as_deref())
            .context("Failed to load configuration")?;
        config.exclude.extend(self.exclude.iter().cloned());
        if self.max_commits.is_some() {
            config.max_commits = self.max_commits;
        }
        if self.no_cache {
            config.cache_enabled = false;
        }
        Ok(config)
    }

    pub fn scan_options(&self, config: &Config) -> ScanOptions {
        ScanOptions {
            max_commits: config.max_commits,
            clear_cache: self.clear_cache,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    Timeline {
        #[arg(long, help = "Output as JSON")]
        json: bool,

        #[arg(long, help = "Output as NDJSON")]
        ndjson: bool,
    },
    Sequence {
        #[arg(long, help = "Output as JSON")]
        json: bool,

        #[arg(long, help = "Output as NDJSON")]
        ndjson: bool,
    },
    Export {
        #[arg(long, help = "Output as JSON")]
        json: bool,

        #[arg(long, help = "Output as NDJSON")]
        ndjson: bool,
    },
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    pub fn execute(self) -> Result<()> {
        match self.command {
            Commands::Timeline { json, ndjson } => crate::timeline::exec(self.common, json, ndjson),
            Commands::Sequence { json, ndjson } => crate::sequence::exec(self.common, json, ndjson),
            Commands::Export { json, ndjson } => crate::export::exec(self.common, json, ndjson),
        }
    }
}
