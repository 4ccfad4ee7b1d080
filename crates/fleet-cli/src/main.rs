//! Fleet CLI: the `fleet` command.

mod cli;
mod commands;
mod support;

use clap::Parser;
use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    support::init_tracing();

    match cli.command {
        Commands::Expand { input, vars, json } => commands::expand::run(input, vars, json),

        Commands::Converge {
            state,
            config,
            json,
        } => commands::converge::run(state, config, json),

        Commands::Status { state, json } => commands::status::run(state, json),
    }
}
