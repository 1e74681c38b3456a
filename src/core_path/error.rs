use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PathError {
    #[error("path cannot be resolved: {0}")]
    Unresolvable(PathBuf),

    #[error("path escapes the server root: {0}")]
    OutsideRoot(PathBuf),

    #[error("path resolution task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
