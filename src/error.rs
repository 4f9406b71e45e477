use thiserror::Error;

pub type Result<T> = std::result::Result<T, GitPulseError>;

#[derive(Error, Debug)]
pub enum GitPulseError {
    #[error("Git discover error: {0}")]
    GitDiscover(#[from] Box<gix::discover::Error>),
    #[error("Git command error: {0}")]
    Git(String),
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("Cache error: {0}")]
    Cache(String),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Invalid exclusion pattern: {0}")]
    Pattern(#[from] globset::Error),
    #[error("Invalid input: {0}")]
    Contract(String),
}

// Manual From implementation for unboxed to boxed conversion
impl From<gix::discover::Error> for GitPulseError {
    fn from(err: gix::discover::Error) -> Self {
        GitPulseError::GitDiscover(Box::new(err))
    }
}
