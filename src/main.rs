use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use polkagent::agent::{Agent, Collaborators};
use polkagent::chain::{EcdsaKeyDerivation, SimulatedConnector};
use polkagent::channels::run_repl;
use polkagent::cli::{Cli, Command, run_doctor_command, run_init_command};
use polkagent::config::AgentConfig;
use polkagent::llm::OpenAiCompatibleModel;

fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("polkagent=info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.with_target(false).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let command = cli.command.clone().unwrap_or(Command::Repl);
    match command {
        Command::Init(args) => return run_init_command(args),
        Command::Doctor { strict } => return run_doctor_command(cli.config.as_deref(), strict).await,
        Command::Prompt { .. } | Command::Repl => {}
    }

    let config = AgentConfig::from_env_with_toml(cli.config.as_deref())
        .context("failed to load configuration (try `polkagent init`)")?;
    let collaborators = Collaborators {
        model: Arc::new(OpenAiCompatibleModel::new(config.llm())),
        keys: Arc::new(EcdsaKeyDerivation::new()),
        connector: Arc::new(SimulatedConnector::new()),
    };
    let agent = Arc::new(Agent::new(config, collaborators));

    if let Err(e) = agent.wait_for_ready_timeout(cli.ready_timeout()).await {
        tracing::error!("Agent did not become ready: {}", e);
        return Err(e.into());
    }

    let result = match command {
        Command::Prompt { text } => {
            let response = agent.handle_prompt(&text.join(" ")).await?;
            println!("{response}");
            Ok(())
        }
        _ => run_repl(Arc::clone(&agent)).await,
    };

    if let Err(e) = agent.disconnect().await {
        tracing::warn!("Disconnect failed: {}", e);
    }
    result
}
