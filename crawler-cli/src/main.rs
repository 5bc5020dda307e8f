//! `image-crawler` binary
//!
//! ```text
//! image-crawler crawl <start_code> <end_code> [--concurrency N] [--output-base DIR]
//! image-crawler sync <folder_path> [--branch B] [--json]
//! ```

mod cli;

use clap::Parser;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = cli::Cli::parse();

    match cli::run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
