use std::sync::Arc;

use anyhow::Result;
use console::style;

use atelier::session::Session;

use crate::prompt::ConsoleNotifier;
use crate::session_file::persist_transcript;

/// Runs a single task to completion without human checkpoints.
pub async fn execute(task: &str) -> Result<()> {
    let session = Session::from_env()?.with_notifier(Arc::new(ConsoleNotifier));

    let outcome = session.run(task).await?;

    let path = persist_transcript(&outcome.transcript)?;
    println!(
        "\n{}\n{}\n",
        style("Final reply:").green().bold(),
        outcome.reply.text()
    );
    println!("{} {}", style("Transcript saved to").dim(), path.display());
    Ok(())
}
