//! `onthesis chat`: interactive conversation.
//!
//! Reads lines from stdin and runs one turn per line on a single
//! conversation, so the dataset is uploaded on the first turn only.
//! Ctrl-C cancels the running turn; Ctrl-D or `/exit` quits.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};

use ot_domain::config::Config;
use ot_domain::Dataset;

use crate::cli::{dataset, render};
use crate::runtime::{run_turn, TurnInput, TurnOutcome, TurnUpdate};
use crate::state::AgentState;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Public entry point
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn chat(
    config: Arc<Config>,
    conversation: Option<String>,
    dataset_path: Option<PathBuf>,
) -> anyhow::Result<()> {
    let state = AgentState::http(config)?;
    let dataset = match &dataset_path {
        Some(path) => Some(dataset::load_dataset(path)?),
        None => None,
    };
    let mut conversation = conversation.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    eprintln!("OnThesis analyst chat");
    eprintln!("Conversation: {conversation}  |  Type /help for commands, Ctrl+D to exit");
    if let Some(ds) = &dataset {
        eprintln!(
            "Dataset: {} rows × {} columns",
            ds.row_count(),
            ds.columns.len()
        );
    }
    eprintln!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        eprint!("you> ");
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        // ── Slash commands ────────────────────────────────
        if trimmed.starts_with('/') {
            if handle_slash_command(trimmed, &state, &mut conversation) {
                break;
            }
            continue;
        }

        // ── User message → agent turn ────────────────────
        if let Err(e) = send_message(&state, &conversation, dataset.as_ref(), trimmed).await {
            eprintln!("\x1B[31merror: {e}\x1B[0m");
        }
    }

    eprintln!("Goodbye!");
    Ok(())
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Slash command handling
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Process a slash command.  Returns `true` if the REPL should exit.
fn handle_slash_command(input: &str, state: &AgentState, conversation: &mut String) -> bool {
    let cmd = input.split_whitespace().next().unwrap_or(input);
    match cmd {
        "/exit" | "/quit" => return true,
        "/reset" => {
            state.sessions.reset(conversation);
            *conversation = uuid::Uuid::new_v4().to_string();
            eprintln!("Started a new conversation: {conversation}");
        }
        "/history" => match state.sessions.get(conversation) {
            Some(session) => {
                for msg in session.history() {
                    eprintln!("[{:?}] {}", msg.role, msg.content);
                }
            }
            None => eprintln!("(no messages yet)"),
        },
        "/help" => {
            eprintln!("/reset    start a new conversation (dataset is uploaded again)");
            eprintln!("/history  show this conversation's messages");
            eprintln!("/exit     quit");
        }
        other => eprintln!("Unknown command: {other} (try /help)"),
    }
    false
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// One turn
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

async fn send_message(
    state: &AgentState,
    conversation: &str,
    dataset: Option<&Dataset>,
    text: &str,
) -> anyhow::Result<()> {
    let mut input = TurnInput::new(text).conversation(conversation);
    input.dataset = dataset.cloned();
    let mut handle = run_turn(state, input).await?;

    let mut steps = render::StepPrinter::default();
    loop {
        let update = tokio::select! {
            update = handle.recv() => update,
            _ = tokio::signal::ctrl_c() => {
                eprintln!("(cancelling)");
                handle.cancel();
                continue;
            }
        };
        let Some(update) = update else { break };

        match update {
            TurnUpdate::Snapshot(message) => steps.show(&message),
            TurnUpdate::Notice { level, text } => render::notice(level, &text),
            TurnUpdate::Finished { message, outcome } => {
                render::artifacts(&message);
                println!("agent> {}", message.content);
                match outcome {
                    TurnOutcome::Failed { error } => eprintln!("\x1B[31merror: {error}\x1B[0m"),
                    TurnOutcome::Cancelled => eprintln!("(turn cancelled)"),
                    TurnOutcome::Completed { .. } => {}
                }
            }
        }
    }
    Ok(())
}
