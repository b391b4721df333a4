use std::sync::Arc;

use anyhow::Result;
use console::style;

use atelier::session::Session;

use crate::prompt::{CliclackGate, ConsoleNotifier};
use crate::session_file::persist_transcript;

/// Interactive loop with checkpoint reviews between tasks.
pub async fn execute() -> Result<()> {
    println!(
        "{}",
        style("atelier - your content production team").green().bold()
    );
    println!("{}\n", style("Type a task, or an empty line to quit.").dim());

    let session = Session::from_env()?
        .with_notifier(Arc::new(ConsoleNotifier))
        .with_gate(Arc::new(CliclackGate));

    loop {
        let task: String = cliclack::input("What should the team work on?")
            .required(false)
            .interact()?;
        if task.trim().is_empty() {
            break;
        }

        match session.run(&task).await {
            Ok(outcome) => {
                let path = persist_transcript(&outcome.transcript)?;
                println!(
                    "\n{}\n{}\n",
                    style("Final reply:").green().bold(),
                    outcome.reply.text()
                );
                println!("{} {}\n", style("Transcript saved to").dim(), path.display());
            }
            Err(e) => {
                println!("{} {}\n", style("Session failed:").red().bold(), e);
            }
        }
    }

    Ok(())
}
