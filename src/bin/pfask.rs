use std::process;

use clap::Parser;
use promptfan::commands::ask::{self, AskArgs};

#[derive(Debug, Parser)]
#[command(
    name = "pfask",
    about = "Dispatch a prompt to the selected models",
    disable_version_flag = true
)]
struct Cli {
    #[command(flatten)]
    ask: AskArgs,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(err) = ask::run(cli.ask).await {
        eprintln!("{err}");
        process::exit(1);
    }
}
