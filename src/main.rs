use std::process::ExitCode;

use clap::Parser;
use finsuite::cli::{Cli, init_tracing, run};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);
    run(cli).await
}
