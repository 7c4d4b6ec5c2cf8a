use imgmig_core::logging;

mod cli;

use crate::cli::CliCommand;

#[tokio::main]
async fn main() {
    // `.env` is optional; real environment variables win.
    let _ = dotenvy::dotenv();

    if logging::init_logging().is_err() {
        logging::init_logging_stderr();
    }

    if let Err(err) = CliCommand::run_from_args().await {
        eprintln!("imgmig error: {:#}", err);
        std::process::exit(1);
    }
}
