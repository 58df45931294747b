use std::io::{self, IsTerminal};

use owo_colors::OwoColorize;

use crate::fanout::catalog::ModelPool;
use crate::fanout::provider::CredentialSet;

/// Prints the model catalog grouped by pool, marking which pools are usable
/// with the currently configured keys.
pub fn run() -> Result<(), String> {
    let credentials = CredentialSet::from_env();
    let colorize = io::stdout().is_terminal();

    for pool in ModelPool::ALL {
        let provider = pool.provider();
        let marker = if credentials.get(provider).is_some() {
            "key configured"
        } else {
            "no key"
        };

        let header = format!("{} ({}, {marker})", pool.label(), provider.display_name());
        if colorize {
            println!("{}", header.bold());
        } else {
            println!("{header}");
        }
        for model in pool.models() {
            println!("  {model}");
        }
        println!();
    }

    Ok(())
}
