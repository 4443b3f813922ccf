//! `canon`: command-line front end for the canon ledger and linter.
//!
//! ```bash
//! canon init --project "The Price of Silence"
//! canon fact set tommy.instrument trombone --source ch1
//! canon scope set ch02 --active therapy-speak,pov-scope --phrase "she would later learn"
//! canon lint chapters/ch02.md --fail-on warning
//! ```

mod cli;
mod commands;
mod logging;

use clap::Parser;
use cli::Cli;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Load .env file if present
    dotenvy::dotenv().ok();
    logging::init_tracing();

    let cli = Cli::parse();
    commands::run(cli).await
}
