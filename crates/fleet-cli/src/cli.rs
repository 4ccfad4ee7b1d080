use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "fleet",
    about = "Fleet: roll modules out across clusters and converge their state",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Expand $(NAME) references in a template
    Expand {
        /// Template text
        input: String,

        /// Value for a name, as NAME=VALUE (repeatable)
        #[arg(long = "var", value_name = "NAME=VALUE")]
        vars: Vec<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Reconcile a state snapshot until nothing changes, then save it
    Converge {
        /// Path to the state JSONL
        #[arg(long, default_value = "fleet-state.jsonl")]
        state: String,

        /// Controller config (TOML); defaults apply when absent
        #[arg(long)]
        config: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show module and assemblage status from a state snapshot
    Status {
        /// Path to the state JSONL
        #[arg(long, default_value = "fleet-state.jsonl")]
        state: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
