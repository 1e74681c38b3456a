// Startup and lifecycle errors of the daemon
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FtpdError {
    #[error("cannot resolve root directory {path}: {source}")]
    RootDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("root is not a directory: {0}")]
    RootNotADirectory(PathBuf),

    #[error("invalid port number: {0}")]
    InvalidPort(i64),

    #[error("buffer size must be greater than zero")]
    InvalidBufferSize,

    #[error("failed to listen on port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: io::Error,
    },

    #[error("fatal error in accept loop: {0}")]
    Accept(#[source] io::Error),

    #[error("server has already been started")]
    AlreadyStarted,
}
