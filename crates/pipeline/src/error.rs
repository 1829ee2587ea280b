use std::io;
use std::path::PathBuf;

use spendgraph_storage::StoreError;

#[derive(Debug)]
pub enum PipelineError {
    /// Reading a block dump file failed; fatal for the whole run.
    Io { path: PathBuf, source: io::Error },
    /// The persistent store failed; partial state cannot be trusted.
    Store(StoreError),
    /// A pipeline thread could not be spawned, terminated early, or
    /// panicked.
    Worker(String),
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineError::Io { path, source } => {
                write!(f, "failed to read block file {}: {source}", path.display())
            }
            PipelineError::Store(error) => write!(f, "store failure: {error}"),
            PipelineError::Worker(message) => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::Io { source, .. } => Some(source),
            PipelineError::Store(error) => Some(error),
            PipelineError::Worker(_) => None,
        }
    }
}

impl From<StoreError> for PipelineError {
    fn from(error: StoreError) -> Self {
        PipelineError::Store(error)
    }
}
