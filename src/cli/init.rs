//! `polkagent init` - write bootstrap credentials to `~/.polkagent/.env`.

use clap::Args;
use rustyline::DefaultEditor;

use crate::config::{DEFAULT_LLM_BASE_URL, validate_endpoint};

#[derive(Args, Debug, Clone, Default)]
pub struct InitArgs {
    /// Chain RPC endpoint (ws://, wss://, http:// or https://)
    #[arg(long)]
    pub endpoint: Option<String>,

    /// API key for the model provider
    #[arg(long)]
    pub api_key: Option<String>,

    /// Secret phrase or seed the signing key is derived from
    #[arg(long)]
    pub signing_secret: Option<String>,

    /// Base URL of an OpenAI-compatible API
    #[arg(long)]
    pub base_url: Option<String>,
}

/// Collect any missing values interactively and save them.
pub fn run_init_command(args: InitArgs) -> anyhow::Result<()> {
    let mut editor: Option<DefaultEditor> = None;
    let mut ask = |label: &str, given: Option<String>| -> anyhow::Result<String> {
        if let Some(value) = given.filter(|v| !v.trim().is_empty()) {
            return Ok(value.trim().to_string());
        }
        if editor.is_none() {
            editor = Some(DefaultEditor::new()?);
        }
        let rl = editor
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("line editor unavailable"))?;
        let value = rl.readline(&format!("{label}: "))?;
        let value = value.trim().to_string();
        if value.is_empty() {
            anyhow::bail!("{label} is required");
        }
        Ok(value)
    };

    let endpoint = ask("Chain endpoint", args.endpoint)?;
    validate_endpoint(&endpoint)?;
    let api_key = ask("LLM API key", args.api_key)?;
    let signing_secret = ask("Signing secret", args.signing_secret)?;

    let mut vars = vec![
        ("CHAIN_ENDPOINT", endpoint.as_str()),
        ("LLM_API_KEY", api_key.as_str()),
        ("SIGNING_SECRET", signing_secret.as_str()),
    ];
    if let Some(base_url) = args.base_url.as_deref().map(str::trim)
        && !base_url.is_empty()
        && base_url != DEFAULT_LLM_BASE_URL
    {
        vars.push(("LLM_BASE_URL", base_url));
    }

    crate::bootstrap::save_bootstrap_env(&vars)?;
    println!(
        "Saved {} settings to {}",
        vars.len(),
        crate::bootstrap::agent_env_path().display()
    );
    Ok(())
}
