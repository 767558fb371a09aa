//! Interactive REPL with line editing.
//!
//! Uses rustyline for line editing, history, and tab-completion. Every
//! non-command line is sent to the agent as a prompt.
//!
//! ## Commands
//!
//! - `/help` - Show available commands
//! - `/status` - Show initialization state and the agent's address
//! - `/quit` or `/exit` - Exit the REPL

use std::borrow::Cow;
use std::path::PathBuf;
use std::sync::Arc;

use rustyline::completion::Completer;
use rustyline::config::Config;
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{CompletionType, Editor, Helper};
use tokio::sync::mpsc;

use crate::agent::Agent;

/// Slash commands available in the REPL.
const SLASH_COMMANDS: &[&str] = &["/help", "/status", "/quit", "/exit"];

const PROMPT: &str = "\x1b[1;36m\u{203A}\x1b[0m ";

/// Rustyline helper for slash-command tab completion.
struct ReplHelper;

impl Completer for ReplHelper {
    type Candidate = String;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<String>)> {
        if !line.starts_with('/') {
            return Ok((0, vec![]));
        }

        let prefix = &line[..pos];
        let matches: Vec<String> = SLASH_COMMANDS
            .iter()
            .filter(|cmd| cmd.starts_with(prefix))
            .map(|cmd| cmd.to_string())
            .collect();

        Ok((0, matches))
    }
}

impl Hinter for ReplHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &rustyline::Context<'_>) -> Option<String> {
        if !line.starts_with('/') || pos < line.len() {
            return None;
        }

        SLASH_COMMANDS
            .iter()
            .find(|cmd| cmd.starts_with(line) && **cmd != line)
            .map(|cmd| cmd[line.len()..].to_string())
    }
}

impl Highlighter for ReplHelper {
    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        Cow::Owned(format!("\x1b[90m{hint}\x1b[0m"))
    }
}

impl Validator for ReplHelper {}
impl Helper for ReplHelper {}

type ReplEditor = Editor<ReplHelper, DefaultHistory>;

/// What a line of input asks the REPL to do.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ReplInput {
    Empty,
    Help,
    Status,
    Quit,
    UnknownCommand(String),
    Prompt(String),
}

fn parse_input(line: &str) -> ReplInput {
    let line = line.trim();
    if line.is_empty() {
        return ReplInput::Empty;
    }
    if !line.starts_with('/') {
        return ReplInput::Prompt(line.to_string());
    }
    match line.to_lowercase().as_str() {
        "/help" => ReplInput::Help,
        "/status" => ReplInput::Status,
        "/quit" | "/exit" => ReplInput::Quit,
        other => ReplInput::UnknownCommand(other.to_string()),
    }
}

/// Get the history file path (~/.polkagent/history).
fn history_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".polkagent")
        .join("history")
}

fn print_help() {
    let h = "\x1b[1m";
    let c = "\x1b[1;36m";
    let d = "\x1b[90m";
    let r = "\x1b[0m";

    println!();
    println!("  {h}Polkagent REPL{r}");
    println!();
    println!("  {h}Commands{r}");
    println!("  {c}/help{r}              {d}show this help{r}");
    println!("  {c}/status{r}            {d}initialization state and address{r}");
    println!("  {c}/quit{r} {c}/exit{r}        {d}exit the repl{r}");
    println!();
    println!("  {h}Examples{r}");
    println!("  {d}add 5FHneW46xGXgs5mUiveU4sbTyGBzmstUspZC92UhjJM694ty as a proxy{r}");
    println!("  {d}is 5FHneW46xGXgs5mUiveU4sbTyGBzmstUspZC92UhjJM694ty my proxy?{r}");
    println!("  {d}send 0.1 WND from Westend to parachain 1000{r}");
    println!();
}

fn print_status(agent: &Agent) {
    println!("  \x1b[90mstatus:\x1b[0m {}", agent.status());
    match agent.address() {
        Some(address) => println!("  \x1b[90maddress:\x1b[0m {}", address),
        None => println!("  \x1b[90maddress:\x1b[0m (not derived yet)"),
    }
    println!("  \x1b[90mendpoint:\x1b[0m {}", agent.config().chain_endpoint());
}

fn build_editor() -> Result<ReplEditor, ReadlineError> {
    let config = Config::builder()
        .history_ignore_dups(true)?
        .auto_add_history(true)
        .completion_type(CompletionType::List)
        .build();
    let mut rl = Editor::with_config(config)?;
    rl.set_helper(Some(ReplHelper));

    let hist_path = history_path();
    if let Some(parent) = hist_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let _ = rl.load_history(&hist_path);
    Ok(rl)
}

/// Read lines on a dedicated thread, waiting for `done` after each one so
/// responses print before the next prompt.
fn spawn_reader(
    tx: mpsc::Sender<ReplInput>,
    done: std::sync::mpsc::Receiver<()>,
) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        let mut rl = match build_editor() {
            Ok(editor) => editor,
            Err(e) => {
                eprintln!("Failed to initialize line editor: {e}");
                return;
            }
        };

        loop {
            let input = match rl.readline(PROMPT) {
                Ok(line) => parse_input(&line),
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => ReplInput::Quit,
                Err(e) => {
                    eprintln!("Input error: {e}");
                    ReplInput::Quit
                }
            };
            let quit = input == ReplInput::Quit;
            if tx.blocking_send(input).is_err() || quit || done.recv().is_err() {
                break;
            }
        }

        let _ = rl.save_history(&history_path());
    })
}

/// Run the interactive loop until `/quit` or end of input.
pub async fn run_repl(agent: Arc<Agent>) -> anyhow::Result<()> {
    println!("\x1b[1mpolkagent\x1b[0m \x1b[90m/help for commands\x1b[0m");
    if let Some(address) = agent.address() {
        println!("\x1b[90maddress: {}\x1b[0m", address);
    }
    println!();

    let (tx, mut rx) = mpsc::channel(1);
    let (done_tx, done_rx) = std::sync::mpsc::channel();
    let reader = spawn_reader(tx, done_rx);

    while let Some(input) = rx.recv().await {
        match input {
            ReplInput::Empty => {}
            ReplInput::Help => print_help(),
            ReplInput::Status => print_status(&agent),
            ReplInput::Quit => break,
            ReplInput::UnknownCommand(cmd) => {
                println!("  \x1b[31munknown command {cmd}\x1b[0m \x1b[90m(try /help)\x1b[0m");
            }
            ReplInput::Prompt(text) => match agent.handle_prompt(&text).await {
                Ok(response) => println!("{response}\n"),
                Err(e) => println!("  \x1b[33m{e}\x1b[0m\n"),
            },
        }
        if done_tx.send(()).is_err() {
            break;
        }
    }

    drop(done_tx);
    let _ = tokio::task::spawn_blocking(move || reader.join()).await;
    Ok(())
}
