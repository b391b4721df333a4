use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

use atelier::transcript::Transcript;

/// Directory where finished transcripts are written, created on demand.
pub fn ensure_session_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .context("could not determine config directory")?
        .join("atelier")
        .join("sessions");
    fs::create_dir_all(&config_dir)?;
    Ok(config_dir)
}

fn session_path() -> Result<PathBuf> {
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let id = uuid::Uuid::new_v4();
    Ok(ensure_session_dir()?.join(format!("{}_{}.json", stamp, id)))
}

/// Writes the transcript out as pretty JSON and returns the path.
pub fn persist_transcript(transcript: &Transcript) -> Result<PathBuf> {
    let path = session_path()?;
    let json = serde_json::to_string_pretty(transcript)?;
    fs::write(&path, json)
        .with_context(|| format!("failed to write session file at {}", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use atelier::models::message::Message;

    #[test]
    fn transcript_roundtrips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let mut transcript = Transcript::new();
        transcript.push(Message::user().with_text("write a post about sleep"));

        let path = dir.path().join("session.json");
        let json = serde_json::to_string_pretty(&transcript).unwrap();
        fs::write(&path, json).unwrap();

        let loaded: Transcript = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.last().unwrap().text(), "write a post about sleep");
    }
}
