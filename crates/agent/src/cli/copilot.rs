//! `onthesis copilot`: one non-streaming copilot question.

use std::sync::Arc;

use ot_client::{CopilotClient, CopilotRequest, HttpCopilot};
use ot_domain::config::Config;

pub async fn copilot(
    config: Arc<Config>,
    message: String,
    context: Option<String>,
) -> anyhow::Result<()> {
    let client = HttpCopilot::new(&config.agent)?;

    let mut request = CopilotRequest::new(message);
    if let Some(raw) = context {
        let value: serde_json::Value = serde_json::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("--context is not valid JSON: {e}"))?;
        request = request.context(value);
    }

    let reply = client.ask(&request).await?;
    if let Some(reasoning) = &reply.reasoning {
        eprintln!("\x1b[2m{reasoning}\x1b[0m");
    }
    println!("{}", reply.text);
    for action in &reply.suggested_actions {
        eprintln!("  → {} ({})", action.label, action.action);
    }
    Ok(())
}
