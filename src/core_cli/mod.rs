use crate::core_error::FtpdError;
use clap::Parser;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "jboxftpd", about = "jbox FTP server daemon.")]
pub struct Cli {
    /// Port to listen on (default: 21021)
    #[arg(short, long, value_name = "port")]
    pub port: Option<i64>,

    /// Root directory served to clients (default: srv/ftp)
    #[arg(short, long, value_name = "dir")]
    pub root: Option<String>,

    /// Path to an optional TOML configuration file
    #[arg(short, long, value_name = "file")]
    pub config: Option<String>,

    /// Enable verbose mode
    #[arg(short, long)]
    pub verbose: bool,
}

/// Checks a `-p` value; anything outside 1-65535 is a startup error.
pub fn validate_port(port: i64) -> Result<u16, FtpdError> {
    u16::try_from(port)
        .ok()
        .filter(|port| *port != 0)
        .ok_or(FtpdError::InvalidPort(port))
}
