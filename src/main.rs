mod cmd;
mod core;
mod dns;
mod pipeline;
mod util;

use std::process::ExitCode;

use crate::cmd::cli::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::init();

    match cli.run().await {
        Ok(_) => ExitCode::from(0),
        Err(e) => {
            eprintln!("{e:#}");
            ExitCode::from(1)
        }
    }
}
