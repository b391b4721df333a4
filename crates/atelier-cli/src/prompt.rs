use std::time::Duration;

use async_trait::async_trait;
use console::style;

use atelier::checkpoint::{CheckpointAction, CheckpointGate, REVIEW_TIMEOUT_SECS};
use atelier::errors::{AgentError, AgentResult};
use atelier::models::message::{Message, MessageContent};
use atelier::notify::Notifier;

/// Renders chat traffic to the terminal
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn message(&self, author: &str, recipient: &str, message: &Message) {
        for content in &message.content {
            match content {
                MessageContent::Text(text) => {
                    if !text.is_empty() {
                        println!(
                            "{} {} {}\n{}\n",
                            style(author).cyan().bold(),
                            style("→").dim(),
                            style(recipient).dim(),
                            text
                        );
                    }
                }
                MessageContent::ToolRequest(request) => match &request.tool_call {
                    Ok(call) => println!(
                        "{} {}\n",
                        style(author).cyan().bold(),
                        style(format!("calling {}...", call.name)).dim()
                    ),
                    Err(e) => println!(
                        "{} {}\n",
                        style(author).cyan().bold(),
                        style(format!("bad tool call: {}", e)).red()
                    ),
                },
                MessageContent::ToolResponse(response) => {
                    if let Err(e) = &response.tool_result {
                        println!("{}\n", style(format!("tool error: {}", e)).red());
                    }
                }
            }
        }
    }
}

/// Checkpoint gate backed by cliclack prompts, with the review timeout
/// the coordinator expects
pub struct CliclackGate;

fn ask(prompt: String) -> std::io::Result<CheckpointAction> {
    let choice = cliclack::select(prompt)
        .item("continue", "Continue", "accept and let the chat end")
        .item("feedback", "Give feedback", "send a note back to the team")
        .item("exit", "Exit", "end the session now")
        .interact()?;

    match choice {
        "feedback" => {
            let text: String = cliclack::input("Your feedback").interact()?;
            Ok(CheckpointAction::Feedback(text))
        }
        "exit" => Ok(CheckpointAction::Exit),
        _ => Ok(CheckpointAction::Continue),
    }
}

#[async_trait]
impl CheckpointGate for CliclackGate {
    async fn review(&self, prompt: &str) -> AgentResult<CheckpointAction> {
        let prompt = prompt.to_string();
        let answer = tokio::time::timeout(
            Duration::from_secs(REVIEW_TIMEOUT_SECS),
            tokio::task::spawn_blocking(move || ask(prompt)),
        )
        .await;

        match answer {
            Err(_) => Err(AgentError::InputTimeout(REVIEW_TIMEOUT_SECS)),
            Ok(Err(join_error)) => Err(AgentError::Internal(join_error.to_string())),
            Ok(Ok(Err(io_error))) => Err(AgentError::Internal(io_error.to_string())),
            Ok(Ok(Ok(action))) => Ok(action),
        }
    }
}
