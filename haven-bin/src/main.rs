use std::process::ExitCode;

use clap::Parser;
use haven_cli::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    match Cli::parse().run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("❌ haven: {e}");
            ExitCode::FAILURE
        }
    }
}
