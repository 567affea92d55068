//! `onthesis run`: one-shot turn.
//!
//! Streams step progress to stderr, prints the final answer to stdout, and
//! exits non-zero if the turn failed.

use std::path::PathBuf;
use std::sync::Arc;

use ot_domain::config::Config;

use crate::cli::{dataset, render};
use crate::runtime::{run_turn, TurnInput, TurnOutcome, TurnUpdate};
use crate::state::AgentState;

pub async fn run(
    config: Arc<Config>,
    message: String,
    conversation: Option<String>,
    dataset_path: Option<PathBuf>,
    json_output: bool,
) -> anyhow::Result<()> {
    let state = AgentState::http(config)?;

    let mut input = TurnInput::new(message);
    input.conversation_id = conversation;
    if let Some(path) = &dataset_path {
        input.dataset = Some(dataset::load_dataset(path)?);
    }

    let mut handle = run_turn(&state, input).await?;
    let conversation = handle.conversation_id().to_string();

    // Ctrl-C cancels the turn; it still ends with a final update.
    let cancel = handle.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let mut steps = render::StepPrinter::default();
    let mut finished = None;
    while let Some(update) = handle.recv().await {
        match update {
            TurnUpdate::Snapshot(message) => {
                if !json_output {
                    steps.show(&message);
                }
            }
            TurnUpdate::Notice { level, text } => render::notice(level, &text),
            TurnUpdate::Finished { message, outcome } => finished = Some((message, outcome)),
        }
    }
    let (message, outcome) =
        finished.ok_or_else(|| anyhow::anyhow!("turn ended without a result"))?;

    if json_output {
        let json = serde_json::json!({
            "conversation": conversation,
            "outcome": outcome,
            "message": &*message,
        });
        println!("{}", serde_json::to_string_pretty(&json)?);
    } else {
        render::artifacts(&message);
        println!("{}", message.content);
        if outcome == TurnOutcome::Cancelled {
            eprintln!("turn cancelled");
        }
    }

    if let TurnOutcome::Failed { error } = &outcome {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
    Ok(())
}
