mod config;
mod constants;
mod core_cli;
mod core_error;
mod core_ftpcommand;
mod core_log;
mod core_network;
mod core_path;
mod server;
mod session;

use crate::config::Config;
use crate::core_cli::{validate_port, Cli};
use crate::core_log::logger::init_logger;
use anyhow::Result;
use clap::Parser;
use std::path::Path;
use std::process;

#[tokio::main]
async fn main() -> Result<()> {
    // Help exits 0, any other argument error exits 1
    let args = match Cli::try_parse() {
        Ok(args) => args,
        Err(e) if e.use_stderr() => {
            let _ = e.print();
            process::exit(1);
        }
        Err(e) => e.exit(),
    };

    init_logger(args.verbose);

    let mut config = match &args.config {
        Some(path) => Config::load_from_file(Path::new(path))?,
        None => Config::default(),
    };

    let port = args.port.map(validate_port).transpose()?;
    config.apply_overrides(port, args.root);

    server::run(config).await
}
