use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod prompt;
mod session_file;

#[derive(Parser)]
#[command(name = "atelier", author, version, about = "A multi-agent content production team", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the team on a single task without human checkpoints
    Run {
        /// The task for the team, e.g. "write a blog post about stress management"
        task: String,
    },
    /// Start an interactive session with checkpoint review
    Session,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Run { task } => commands::run::execute(&task).await,
        Command::Session => commands::session::execute().await,
    }
}
