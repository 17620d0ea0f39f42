use clap::Parser;
use targetd_core::logging::{self, LogSink};

mod cli;

use crate::cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging before anything can fail.
    let sink = logging::init(cli.logs_to_stderr());

    if let Err(err) = cli.run().await {
        eprintln!("targetd error: {:#}", err);
        if let LogSink::File(path) = sink {
            eprintln!("details in {}", path.display());
        }
        std::process::exit(1);
    }
}
