//! Command-line interface.

pub mod doctor;
pub mod init;

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};

pub use self::doctor::run_doctor_command;
pub use self::init::{InitArgs, run_init_command};

#[derive(Parser, Debug)]
#[command(
    name = "polkagent",
    version,
    about = "Natural-language proxy management and cross-chain transfers."
)]
pub struct Cli {
    /// Path to a TOML config file (default: ~/.polkagent/config.toml)
    #[arg(long, global = true, env = "POLKAGENT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Seconds to wait for initialization before giving up
    #[arg(long, global = true, default_value_t = 30)]
    pub ready_timeout: u64,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    pub fn ready_timeout(&self) -> Duration {
        Duration::from_secs(self.ready_timeout)
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run a single prompt and print the response.
    Prompt {
        /// The instruction, e.g. "add 5F... as my proxy"
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Start the interactive REPL (the default).
    Repl,

    /// Save bootstrap credentials to ~/.polkagent/.env.
    Init(InitArgs),

    /// Check configuration and endpoint reachability.
    Doctor {
        /// Exit with an error if any check fails
        #[arg(long)]
        strict: bool,
    },
}
